//! The contract between the mapper and a storage backend.

use crate::error::StorageResult;
use crate::statement::Statement;
use crate::value::Value;

/// One row returned by storage: column names paired with values, in the order
/// the backend produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Set `column`, replacing an existing cell in place or appending a new one.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}

/// What a backend reports after executing a [`Statement`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Rows inserted, updated or deleted.
    pub affected: u64,
    /// Key generated by the last insert, when the backend reports one.
    pub last_insert_id: Option<i64>,
    /// Rows returned by a select.
    pub rows: Vec<Row>,
}

impl Outcome {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            affected: 0,
            last_insert_id: None,
            rows,
        }
    }

    pub fn affected(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    pub fn inserted(id: i64) -> Self {
        Self {
            affected: 1,
            last_insert_id: Some(id),
            rows: Vec::new(),
        }
    }
}

/// A storage backend able to run the four statement kinds the mapper emits.
///
/// Implementations execute exactly one statement per call and report failures
/// as [`StorageError`](crate::StorageError) without retrying.
pub trait StorageAdapter {
    fn execute(&self, statement: &Statement<'_>) -> StorageResult<Outcome>;
}

impl<S: StorageAdapter + ?Sized> StorageAdapter for &S {
    fn execute(&self, statement: &Statement<'_>) -> StorageResult<Outcome> {
        (**self).execute(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_set_replaces_in_place() {
        let mut row: Row = [("idProduct", Value::I64(1)), ("name", Value::from("Chair"))]
            .into_iter()
            .collect();
        row.set("name", "Table");
        row.set("price", 9.5);
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            vec!["idProduct", "name", "price"]
        );
        assert_eq!(row.get("name"), Some(&Value::from("Table")));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 3);
        assert_eq!(
            row.iter().last(),
            Some(("price", &Value::F64(9.5)))
        );
    }

    #[test]
    fn outcome_constructors() {
        assert_eq!(Outcome::inserted(4).last_insert_id, Some(4));
        assert_eq!(Outcome::affected(2).affected, 2);
        assert!(Outcome::rows(vec![Row::new()]).last_insert_id.is_none());
    }
}
