// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for resolver construction and dispatch.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// No constructor is registered for the spec's type tag.
    #[error("Resolver '{spec}' has unknown type '{resolver_type}'")]
    InvalidResolverType { spec: String, resolver_type: String },

    /// The spec's backend configuration is unusable.
    #[error("Resolver '{spec}' has invalid configuration: {reason}")]
    InvalidConfig { spec: String, reason: String },

    /// The resolver does not implement the requested operation.
    #[error("Resolver '{resolver}' does not support {operation}")]
    Unsupported { resolver: String, operation: String },

    /// The backend failed while serving a request.
    #[error("Resolver '{resolver}' failed: {reason}")]
    Backend { resolver: String, reason: String },
}
