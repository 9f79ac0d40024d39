//! Naming conventions that map entity type names onto storage identifiers.

/// Table name for an entity type: the type name with its first letter lower-cased.
///
/// `Product` maps to `product`, `OrderLine` to `orderLine`.
pub fn table_name(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Key column name for an entity type: `"id"` followed by the type name.
pub fn key_column(type_name: &str) -> String {
    format!("id{}", type_name)
}

/// Whether `s` can be used unquoted as a table or column name.
pub(crate) fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}
