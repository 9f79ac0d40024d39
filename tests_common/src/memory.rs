//! An in-memory [`StorageAdapter`] that interprets statements directly.
//!
//! Comparison follows SQLite closely enough for the shared suites: NULL never
//! equals anything, and ordering places NULL before numbers before text.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use rowmap_core::transactions::{TransactionDefinition, TransactionManager};
use rowmap_core::{
    Direction, Limit, Outcome, Registry, Row, SortKey, Statement, StorageAdapter, StorageError,
    StorageResult, Value,
};

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    key_column: String,
    unique: Vec<String>,
    rows: Vec<Row>,
    next_id: i64,
}

impl Table {
    fn check_column(&self, table: &str, column: &str) -> StorageResult<()> {
        if self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(StorageError::message(format!(
                "no such column: {} (table {})",
                column, table
            )))
        }
    }

    fn check_unique(&self, table: &str, candidate: &Row, skip: Option<usize>) -> StorageResult<()> {
        for column in &self.unique {
            let Some(value) = candidate.get(column) else {
                continue;
            };
            let clash = self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .any(|(_, row)| row.get(column).map_or(false, |v| same(v, value)));
            if clash {
                return Err(StorageError::constraint(
                    Some(column.as_str()),
                    format!("UNIQUE constraint failed: {}.{}", table, column),
                ));
            }
        }
        Ok(())
    }
}

/// Tables kept in memory, with snapshot transactions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RefCell<BTreeMap<String, Table>>,
    snapshot: RefCell<Option<BTreeMap<String, Table>>>,
    read_only: Cell<bool>,
    calls: Cell<usize>,
    log: RefCell<Vec<String>>,
    fail_next: RefCell<Option<StorageError>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// One table per registered entity type.
    pub fn from_registry(registry: &Registry) -> Self {
        let storage = Self::new();
        for meta in registry.metas() {
            storage.create_table(&meta.table, &meta.key_column, meta.columns);
        }
        storage
    }

    /// Create (or replace) `table`. The key column is filled from a counter
    /// when inserted as NULL.
    pub fn create_table(&self, table: &str, key_column: &str, columns: &[&str]) {
        self.tables.borrow_mut().insert(
            table.to_string(),
            Table {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                key_column: key_column.to_string(),
                unique: Vec::new(),
                rows: Vec::new(),
                next_id: 1,
            },
        );
    }

    pub fn with_unique(self, table: &str, column: &str) -> Self {
        if let Some(t) = self.tables.borrow_mut().get_mut(table) {
            t.unique.push(column.to_string());
        }
        self
    }

    /// Number of statements executed so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// `"<op> <table>"` for every executed statement.
    pub fn statements(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Fail the next statement with `error` instead of running it.
    pub fn fail_next(&self, error: StorageError) {
        *self.fail_next.borrow_mut() = Some(error);
    }

    /// Current rows of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .borrow()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn run(&self, statement: &Statement<'_>) -> StorageResult<Outcome> {
        let mut tables = self.tables.borrow_mut();
        let name = statement.table();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::message(format!("no such table: {}", name)))?;
        if self.read_only.get() && !matches!(statement, Statement::Select { .. }) {
            return Err(StorageError::message("attempt to write a readonly database"));
        }

        match statement {
            Statement::Select {
                filters,
                order,
                limit,
                ..
            } => select(name, table, filters, order, *limit).map(Outcome::rows),
            Statement::Insert {
                columns, values, ..
            } => {
                let mut row = Row::new();
                for column in &table.columns {
                    row.set(column.as_str(), Value::Null);
                }
                for (column, value) in columns.iter().zip(values) {
                    table.check_column(name, column)?;
                    row.set(*column, value.clone());
                }
                let id = match row.get(&table.key_column).and_then(Value::as_i64) {
                    Some(id) => id,
                    None => table.next_id,
                };
                if table
                    .rows
                    .iter()
                    .any(|r| r.get(&table.key_column).and_then(Value::as_i64) == Some(id))
                {
                    return Err(StorageError::constraint(
                        Some(table.key_column.as_str()),
                        format!("UNIQUE constraint failed: {}.{}", name, table.key_column),
                    ));
                }
                row.set(table.key_column.as_str(), Value::I64(id));
                table.check_unique(name, &row, None)?;
                table.next_id = table.next_id.max(id + 1);
                table.rows.push(row);
                Ok(Outcome::inserted(id))
            }
            Statement::Update {
                assignments,
                key_column,
                key,
                ..
            } => {
                table.check_column(name, key_column)?;
                for (column, _) in assignments {
                    table.check_column(name, column)?;
                }
                let targets: Vec<usize> = (0..table.rows.len())
                    .filter(|&i| table.rows[i].get(key_column).map_or(false, |v| same(v, key)))
                    .collect();
                for &i in &targets {
                    let mut updated = table.rows[i].clone();
                    for (column, value) in assignments {
                        updated.set(*column, value.clone());
                    }
                    table.check_unique(name, &updated, Some(i))?;
                    table.rows[i] = updated;
                }
                Ok(Outcome::affected(targets.len() as u64))
            }
            Statement::Delete {
                key_column, key, ..
            } => {
                table.check_column(name, key_column)?;
                let before = table.rows.len();
                table
                    .rows
                    .retain(|row| !row.get(key_column).map_or(false, |v| same(v, key)));
                Ok(Outcome::affected((before - table.rows.len()) as u64))
            }
        }
    }
}

fn select(
    name: &str,
    table: &Table,
    filters: &[(&str, Value)],
    order: &[SortKey<'_>],
    limit: Option<Limit>,
) -> StorageResult<Vec<Row>> {
    for (column, _) in filters {
        table.check_column(name, column)?;
    }
    for key in order {
        table.check_column(name, key.column)?;
    }
    let mut rows: Vec<Row> = table
        .rows
        .iter()
        .filter(|row| {
            filters
                .iter()
                .all(|(column, value)| row.get(column).map_or(false, |v| same(v, value)))
        })
        .cloned()
        .collect();
    // Stable, so ties keep insertion order.
    rows.sort_by(|a, b| {
        order.iter().fold(Ordering::Equal, |acc, key| {
            acc.then_with(|| {
                let ord = compare(
                    a.get(key.column).unwrap_or(&Value::Null),
                    b.get(key.column).unwrap_or(&Value::Null),
                );
                match key.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            })
        })
    });
    Ok(match limit {
        None => rows,
        Some(limit) => rows
            .into_iter()
            .skip(limit.skip() as usize)
            .take(limit.take() as usize)
            .collect(),
    })
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::I32(_) | Value::I64(_) | Value::F64(_) | Value::Bool(_) => 1,
        Value::String(_) => 2,
    }
}

fn number(v: &Value) -> f64 {
    match v {
        Value::I32(i) => f64::from(*i),
        Value::I64(i) => *i as f64,
        Value::F64(f) => *f,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::I64(x), Value::I64(y)) => x.cmp(y),
        _ if rank(a) == 1 && rank(b) == 1 => number(a).total_cmp(&number(b)),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// SQL equality: NULL equals nothing, not even NULL.
fn same(a: &Value, b: &Value) -> bool {
    !a.is_null() && !b.is_null() && rank(a) == rank(b) && compare(a, b) == Ordering::Equal
}

impl StorageAdapter for MemoryStorage {
    fn execute(&self, statement: &Statement<'_>) -> StorageResult<Outcome> {
        self.calls.set(self.calls.get() + 1);
        self.log
            .borrow_mut()
            .push(format!("{} {}", statement.op(), statement.table()));
        if let Some(error) = self.fail_next.borrow_mut().take() {
            return Err(error);
        }
        self.run(statement)
    }
}

impl TransactionManager for MemoryStorage {
    fn begin(&self, def: &TransactionDefinition) -> StorageResult<()> {
        let mut snapshot = self.snapshot.borrow_mut();
        if snapshot.is_some() {
            return Err(StorageError::message(
                "cannot start a transaction within a transaction",
            ));
        }
        *snapshot = Some(self.tables.borrow().clone());
        self.read_only.set(def.read_only);
        Ok(())
    }

    fn commit(&self) -> StorageResult<()> {
        self.read_only.set(false);
        self.snapshot
            .borrow_mut()
            .take()
            .map(|_| ())
            .ok_or_else(|| StorageError::message("cannot commit - no transaction is active"))
    }

    fn rollback(&self) -> StorageResult<()> {
        self.read_only.set(false);
        let saved = self
            .snapshot
            .borrow_mut()
            .take()
            .ok_or_else(|| StorageError::message("cannot rollback - no transaction is active"))?;
        *self.tables.borrow_mut() = saved;
        Ok(())
    }
}
