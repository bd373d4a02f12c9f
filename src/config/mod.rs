// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod runtime;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, validate_model, AttributeConfig, DataflowConfig, DefaultConfig,
    ModelConfig, NamespaceConfig, Ordered, PatternConfig, RecordAttributeConfig, RecordConfig,
};
pub use runtime::RuntimeBuilder;
