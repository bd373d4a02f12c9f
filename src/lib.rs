// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // resolver backends
pub mod compiler;   // pattern dependency ordering
pub mod config;     // model files
pub mod dataflow;   // dataflow registration and matching
pub mod engine;     // the runtime facade
pub mod errors;     // error handling
pub mod model;      // paths, values and schemas
pub mod observability;
pub mod registry;   // namespaces and interned schemas
pub mod resolver;   // resolver bindings
pub mod traits;     // unified abstractions
pub mod utils;
pub mod validation; // instance validation
