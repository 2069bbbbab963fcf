// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Translation options, usable directly as command-line arguments.

use clap::Args;
use serde::Serialize;

/// How the constructor of a custom-typed value is recorded in its first slot.
#[derive(clap::ValueEnum, Serialize, Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminantStrategy {
    /// The 0-based constructor index, as an integer
    #[default]
    Integer,
    /// A boolean for types with exactly two constructors (`false` for the
    /// first, `true` for the second); an integer index otherwise
    Boolean,
}

/// Options that control the translation pipeline.
#[derive(Args, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslationConf {
    #[arg(value_enum, long, default_value_t = DiscriminantStrategy::Integer)]
    /// Encoding of custom type discriminants
    pub discriminant: DiscriminantStrategy,

    #[arg(long)]
    /// Record every rule after every pipeline step
    pub trace: bool,

    #[arg(long)]
    /// Translate independent rules in parallel
    pub parallel: bool,

    #[arg(long)]
    /// Merge linear chains of clauses after translation
    pub medium_step: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        conf: TranslationConf,
    }

    #[test]
    fn test_flatten_into_command_line() {
        let cli = Cli::parse_from(["hornc"]);
        assert_eq!(cli.conf, TranslationConf::default());

        let cli = Cli::parse_from(["hornc", "--discriminant", "boolean", "--trace", "--medium-step"]);
        assert_eq!(
            cli.conf,
            TranslationConf {
                discriminant: DiscriminantStrategy::Boolean,
                trace: true,
                parallel: false,
                medium_step: true,
            }
        );
    }
}
