// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resolver backends for schemaflow.
//!
//! # Available Backends
//!
//! ## Memory Backend
//! In-process store keyed by one attribute per type:
//! - **Operations**: create, update, delete, equality queries
//! - **Use Case**: tests, prototyping, the CLI
//!
//! ## Stub Backend
//! - **StubResolver**: echoes writes back, finds nothing
//! - **FailingResolver**: fails every request, for error handling tests
//!
//! # Architecture
//!
//! ```text
//! ResolverSpec → ResolverFactory → Arc<dyn Resolver> → ResolverRegistry
//! ```
//!
//! Storage engines outside this crate plug in through
//! [`ResolverFactory::with_constructor`].
//!
//! # Examples
//!
//! ```rust
//! use schemaflow::backends::ResolverFactory;
//! use schemaflow::resolver::ResolverSpec;
//!
//! let factory = ResolverFactory::builtin();
//! let spec = ResolverSpec::new("accounts", "memory").with_config("key", "Email");
//! let resolver = factory.create(&spec)?;
//! assert_eq!(resolver.name(), "accounts");
//! # Ok::<(), schemaflow::errors::ResolverError>(())
//! ```

pub mod factory;
pub mod memory;
pub mod stub;

pub use factory::{ResolverConstructor, ResolverFactory};
pub use memory::InMemoryResolver;
pub use stub::{FailingResolver, StubResolver};
