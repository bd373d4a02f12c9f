// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by [`Runtime`](crate::engine::Runtime) operations that span
//! the registries.

use thiserror::Error;

use crate::errors::{CompileError, ResolverError};
use crate::model::ErrorValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// An instance failed validation where success was required.
    #[error("Validation failed: {0}")]
    Validation(#[from] ErrorValue),

    #[error("No resolver bound to '{path}'")]
    NoResolver { path: String },
}
