// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Generic traversals of expressions.

pub mod subst;
pub mod visit;
