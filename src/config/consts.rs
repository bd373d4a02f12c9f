/// Separator between the namespace and the name in a type path
pub const NAMESPACE_SEPARATOR: char = '/';
/// Separator between segments of a dotted attribute reference
pub const REFERENCE_SEPARATOR: char = '.';
/// Trailing marker that turns an attribute assignment into a query
pub const QUERY_MARKER: char = '?';

/// Namespace holding the built-in scalar attribute types
pub const KERNEL_NAMESPACE: &str = "Kernel";
/// Identity attribute interned into every namespace on creation
pub const IDENTITY_ATTRIBUTE: &str = "Id";
/// Event interned into every namespace on creation
pub const NAMESPACE_INITIALIZED_EVENT: &str = "NamespaceInitialized";
/// Attribute of a lifecycle event carrying the affected entity instance
pub const LIFECYCLE_INSTANCE_ATTRIBUTE: &str = "Instance";

/// Reserved resolver target meaning "every type in the namespace"
pub const NAMESPACE_LEVEL_TARGET: &str = "*";

/// Keyword separating a namespace from its alias in an import spec
pub const IMPORT_ALIAS_KEYWORD: &str = "as";
