// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::model::Instance;
use crate::registry::NamespaceTable;

/// Same type and, when the type declares identity attributes, equal values for
/// all of them. Types without identity attributes fall back to full structural
/// equality.
pub fn identity_equal(table: &NamespaceTable, a: &Instance, b: &Instance) -> bool {
    if a.path != b.path {
        return false;
    }
    let identity = table.identity_attributes(&a.path);
    if identity.is_empty() {
        return a == b;
    }
    identity.iter().all(|name| a.get(name) == b.get(name))
}

/// Equal attribute maps, regardless of type.
pub fn attribute_equal(a: &Instance, b: &Instance) -> bool {
    a.attributes == b.attributes
}
