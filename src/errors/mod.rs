// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod compile;
mod config;
mod resolver;
mod runtime;

pub use compile::CompileError;
pub use config::ConfigError;
pub use resolver::ResolverError;
pub use runtime::RuntimeError;
