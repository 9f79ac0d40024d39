//! The per-type descriptor implemented by `#[derive(Entity)]`.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ColumnError, RepoError, RepoResult};
use crate::storage::Row;
use crate::value::{FromValue, Value};

/// A record type stored as one row of one table.
///
/// Usually generated by `#[derive(Entity)]`. The physical columns listed in
/// [`COLUMNS`](Entity::COLUMNS) are exactly the fields the mapper reads and
/// writes; one of them is the `"id" + TYPE_NAME` key column.
pub trait Entity: Default + 'static {
    /// Type name the table and key column are derived from.
    const TYPE_NAME: &'static str;
    /// Physical columns in declaration order, key included.
    const COLUMNS: &'static [&'static str];

    /// Current key; `None` until the entity has been persisted.
    fn key(&self) -> Option<i64>;

    fn set_key(&mut self, key: Option<i64>);

    /// Value of a physical column, or `None` for an unknown column name.
    fn column_value(&self, column: &str) -> Option<Value>;

    /// Overwrite physical fields from `row`.
    ///
    /// Columns absent from the row keep their current value. Every cell is
    /// converted before any field is assigned, so on error the entity is
    /// unchanged.
    fn assign_row(&mut self, row: &Row) -> RepoResult<()>;

    /// The computed-property cache carried by this instance, if it has one.
    fn property_cache(&self) -> Option<&PropertyCache> {
        None
    }
}

/// Convert the cell `column` of `row` for a field of type `T`.
///
/// `Ok(None)` when the row has no such column. Used by derived
/// [`Entity::assign_row`] implementations.
pub fn read_column<T: FromValue>(
    row: &Row,
    type_name: &'static str,
    column: &'static str,
) -> RepoResult<Option<T>> {
    match row.get(column) {
        None => Ok(None),
        Some(value) => T::from_value(value.clone()).map(Some).map_err(|source| {
            RepoError::mapping(ColumnError {
                type_name,
                column,
                source,
            })
        }),
    }
}

type Cached = Option<Arc<dyn Any + Send + Sync>>;

/// Per-instance cache of resolved computed properties.
///
/// Cloning yields an empty cache, and two caches always compare equal, so an
/// entity deriving `Clone`/`PartialEq` is compared on its physical fields only.
#[derive(Default)]
pub struct PropertyCache {
    entries: RefCell<HashMap<String, Cached>>,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached outcome for `name`: `None` when not yet resolved.
    pub fn get(&self, name: &str) -> Option<Cached> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn insert(&self, name: &str, value: Cached) {
        self.entries.borrow_mut().insert(name.to_string(), value);
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Clone for PropertyCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for PropertyCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Debug for PropertyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let mut keys: Vec<&str> = entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("PropertyCache")
            .field("resolved", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_records_resolved_names_including_none() {
        let cache = PropertyCache::new();
        assert!(cache.get("category").is_none());
        cache.insert("category", None);
        cache.insert("label", Some(Arc::new(String::from("x"))));
        assert!(cache.is_resolved("category"));
        assert!(matches!(cache.get("category"), Some(None)));
        let label = cache.get("label").flatten().expect("cached");
        assert_eq!(label.downcast_ref::<String>().map(String::as_str), Some("x"));
        assert_eq!(format!("{:?}", cache), r#"PropertyCache { resolved: ["category", "label"] }"#);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn read_column_converts_or_reports_the_column() {
        let row: Row = [("idProduct", Value::I64(4)), ("name", Value::I64(9))]
            .into_iter()
            .collect();
        assert_eq!(
            read_column::<Option<i64>>(&row, "Product", "idProduct").unwrap(),
            Some(Some(4))
        );
        assert_eq!(read_column::<f64>(&row, "Product", "price").unwrap(), None);
        let err = read_column::<String>(&row, "Product", "name").unwrap_err();
        let source = std::error::Error::source(&err).expect("column error");
        assert_eq!(
            source.to_string(),
            "column `name` of `Product`: expected string, found i64"
        );
    }

    #[test]
    fn clones_start_empty_and_compare_equal() {
        let cache = PropertyCache::new();
        cache.insert("category", None);
        let copy = cache.clone();
        assert!(copy.is_empty());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache, copy);
    }
}
