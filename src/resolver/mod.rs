// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resolver registry: which resolver(s) serve each type path.
//!
//! Specs are declarative ([`ResolverSpec`]); the registry turns each into a
//! live [`Resolver`](crate::traits::Resolver) through the constructor table in
//! [`ResolverFactory`](crate::backends::ResolverFactory) and binds it in
//! override or compose mode.

mod registry;
mod spec;

pub use registry::{ResolverEntry, ResolverRegistry};
pub use spec::{ResolutionMode, ResolverKey, ResolverSpec};
