// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Schema validation.
//!
//! Everything here is a pure function of a [`NamespaceTable`](crate::registry::NamespaceTable)
//! snapshot and the input value. Validation failures come back as
//! [`ErrorValue`](crate::model::ErrorValue) data, never as panics.

mod attribute;
mod identity;
mod record;


pub use attribute::{default_value, validate};
pub use identity::{attribute_equal, identity_equal};
pub use record::{make_instance, validate_record};
