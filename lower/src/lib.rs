// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Lowering of Horn specifications into flat Horn clauses.
//!
//! The [`pipeline::Pipeline`] rewrites every rule in turn: operations are
//! inlined, custom types are laid out as fixed-width vectors of primitive
//! slots ([`layout`]), selector function invocations are enumerated through
//! the [`selector`] registry, aggregations are unrolled ([`sum`]), and the
//! result is simplified, renamed, folded and filtered.

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::type_complexity)]
#![deny(clippy::uninlined_format_args)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod check;
pub mod conf;
pub mod error;
pub mod layout;
pub mod oracle;
pub mod pipeline;
pub mod program;
pub mod selector;
pub mod steps;
pub mod sum;
