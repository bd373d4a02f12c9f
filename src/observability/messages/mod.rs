// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Organization
//!
//! * `registry` - namespace creation, interning and dataflow registration
//! * `compiler` - attribute ordering, cycle detection and opcode caching
//! * `resolver` - resolver construction and dispatch
//!
//! # Usage Pattern
//!
//! ```rust
//! use schemaflow::observability::messages::compiler::PatternCompiled;
//!
//! let order = vec!["Balance", "Fee"];
//! let msg = PatternCompiled {
//!     record: "Acme/Account",
//!     order: &order,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod compiler;
pub mod registry;
pub mod resolver;

/// A message that knows how to emit itself as a structured `tracing` event.
pub trait StructuredLog {
    /// Emit the message at its own level with its fields attached.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
