// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod path;
mod schema;
mod value;

pub use path::Path;
pub use schema::{
    AttributeDecl, AttributeKind, AttributeSchema, Check, CheckFn, DefaultValue, RecordDecl,
    RecordSchema, RecordTag,
};
pub use value::{Attributes, ErrorValue, Instance, Tagged, ValidationErrorKind, Value};
