//! Mapping of SQLite error messages onto [`StorageError`] variants.

use rowmap_core::StorageError;

/// Column named by a SQLite constraint message such as
/// `UNIQUE constraint failed: product.ref`.
///
/// Only `table.column` targets yield a column; named CHECK constraints do not.
pub(crate) fn constraint_column(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("constraint failed:")?;
    let target = rest
        .trim()
        .split(|c: char| c == ',' || c.is_whitespace())
        .next()?;
    let (_, column) = target.split_once('.')?;
    let column = column.trim_end_matches(|c: char| !(c == '_' || c.is_ascii_alphanumeric()));
    (!column.is_empty()).then_some(column)
}

/// Classify a driver error by its message.
pub(crate) fn classify<E>(e: E) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = e.to_string();
    if message.contains("constraint failed") {
        StorageError::constraint(constraint_column(&message), message.as_str())
    } else {
        StorageError::other(e)
    }
}
