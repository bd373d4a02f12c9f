// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while loading a model file and building a runtime from it.

use thiserror::Error;

use crate::errors::{CompileError, ResolverError, RuntimeError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Duplicate {kind} '{name}'")]
    Duplicate { kind: String, name: String },

    #[error("Invalid model: {0}")]
    Validation(String),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
