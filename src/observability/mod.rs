// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic output goes through message structs in [`messages`]. Each
//! message implements `Display` for the human-readable line and
//! [`messages::StructuredLog`] for the structured `tracing` event, so no log
//! call site carries a magic string.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::registry` - namespace and schema registry mutations
//! * `messages::compiler` - pattern compilation and opcode caching
//! * `messages::resolver` - resolver registration and dispatch
//!
//! # Usage
//!
//! ```rust
//! use schemaflow::observability::messages::registry::NamespaceCreated;
//! use schemaflow::observability::messages::StructuredLog;
//!
//! NamespaceCreated { namespace: "Acme.Core", replaced: false }.log();
//! ```

pub mod messages;
