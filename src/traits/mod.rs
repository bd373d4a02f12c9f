// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod resolver;

pub use resolver::{Resolver, ResolverRequest};
