#![forbid(unsafe_code)]
//! SQL rendering for [`rowmap_core::Statement`].
//!
//! Every value is bound as a parameter; table and column names are written
//! verbatim. Backends pick the placeholder style they understand:
//! - [`Placeholder::Question`]: `?` (SQLite/libsql, MySQL)
//! - [`Placeholder::Dollar`]: `$1`, `$2`, ... (Postgres)

use rowmap_core::{Limit, SortKey, Statement, Value};

/// Placeholder representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placeholder {
    Dollar, // $1, $2, ...
    #[default]
    Question, // ?
}

fn placeholder_n(ph: Placeholder, n: usize) -> String {
    match ph {
        Placeholder::Dollar => format!("${}", n),
        Placeholder::Question => "?".to_string(),
    }
}

/// Render `statement` as SQL text plus its parameters in binding order.
pub fn render(statement: &Statement<'_>, ph: Placeholder) -> (String, Vec<Value>) {
    match statement {
        Statement::Select {
            table,
            filters,
            order,
            limit,
        } => select(table, filters, order, *limit, ph),
        Statement::Insert {
            table,
            columns,
            values,
        } => (insert(table, columns, ph), values.clone()),
        Statement::Update {
            table,
            assignments,
            key_column,
            key,
        } => update(table, assignments, key_column, key, ph),
        Statement::Delete {
            table,
            key_column,
            key,
        } => (delete(table, key_column, ph), vec![key.clone()]),
    }
}

/// Build `SELECT * FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT ...]`.
pub fn select(
    table: &str,
    filters: &[(&str, Value)],
    order: &[SortKey<'_>],
    limit: Option<Limit>,
    ph: Placeholder,
) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT * FROM {table}", table = table);
    let (where_sql, params) = build_where_and(filters, ph);
    if !where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&where_sql);
    }
    let order_sql = order_by_clause(order);
    if !order_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&order_sql);
    }
    if let Some(limit) = limit {
        sql.push(' ');
        sql.push_str(&limit_clause(limit, ph));
    }
    (sql, params)
}

/// `LIMIT n`, or a window as `LIMIT skip,take` (SQLite/MySQL) or
/// `LIMIT take OFFSET skip` (Postgres, which has no comma form).
pub fn limit_clause(limit: Limit, ph: Placeholder) -> String {
    match (limit, ph) {
        (Limit::First(n), _) => format!("LIMIT {}", n),
        (Limit::Window { skip, take }, Placeholder::Question) => {
            format!("LIMIT {},{}", skip, take)
        }
        (Limit::Window { skip, take }, Placeholder::Dollar) => {
            format!("LIMIT {} OFFSET {}", take, skip)
        }
    }
}

/// Build `INSERT INTO <table> (<cols>) VALUES (<placeholders>)`.
pub fn insert(table: &str, columns: &[&str], ph: Placeholder) -> String {
    let phs: Vec<String> = (1..=columns.len()).map(|i| placeholder_n(ph, i)).collect();
    format!(
        "INSERT INTO {table} ({cols}) VALUES ({vals})",
        table = table,
        cols = columns.join(", "),
        vals = phs.join(", ")
    )
}

/// Build `UPDATE <table> SET <col1> = <ph1>, ... WHERE <key> = <phN>`.
pub fn update(
    table: &str,
    assignments: &[(&str, Value)],
    key_column: &str,
    key: &Value,
    ph: Placeholder,
) -> (String, Vec<Value>) {
    let mut set_clause = Vec::with_capacity(assignments.len());
    let mut params = Vec::with_capacity(assignments.len() + 1);
    for (i, (col, val)) in assignments.iter().enumerate() {
        set_clause.push(format!("{} = {}", col, placeholder_n(ph, i + 1)));
        params.push(val.clone());
    }
    params.push(key.clone());
    let sql = format!(
        "UPDATE {table} SET {set_clause} WHERE {key} = {where_ph}",
        table = table,
        set_clause = set_clause.join(", "),
        key = key_column,
        where_ph = placeholder_n(ph, assignments.len() + 1)
    );
    (sql, params)
}

/// Build `DELETE FROM <table> WHERE <key> = <ph>`.
pub fn delete(table: &str, key_column: &str, ph: Placeholder) -> String {
    format!(
        "DELETE FROM {table} WHERE {key} = {ph}",
        table = table,
        key = key_column,
        ph = placeholder_n(ph, 1)
    )
}

/// Build WHERE clause for simple conjunction (AND) of equality comparisons.
/// Returns ("WHERE <field1> = <ph> AND <field2> = <ph> ...", params_in_order)
pub fn build_where_and(params: &[(&str, Value)], ph: Placeholder) -> (String, Vec<Value>) {
    if params.is_empty() {
        return (String::new(), Vec::new());
    }
    let mut clauses: Vec<String> = Vec::with_capacity(params.len());
    let mut out_params: Vec<Value> = Vec::with_capacity(params.len());
    for (i, (field, val)) in params.iter().enumerate() {
        clauses.push(format!("{} = {}", field, placeholder_n(ph, i + 1)));
        out_params.push(val.clone());
    }
    (format!("WHERE {}", clauses.join(" AND ")), out_params)
}

/// Build `ORDER BY <col> <dir>, ...`, or an empty string for no sort keys.
pub fn order_by_clause(order: &[SortKey<'_>]) -> String {
    if order.is_empty() {
        return String::new();
    }
    let keys: Vec<String> = order
        .iter()
        .map(|k| format!("{} {}", k.column, k.direction))
        .collect();
    format!("ORDER BY {}", keys.join(", "))
}
