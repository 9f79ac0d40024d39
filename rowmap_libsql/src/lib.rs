#![forbid(unsafe_code)]
#![cfg_attr(
    not(feature = "libsql-backend"),
    doc = "Enable feature `libsql-backend` to use this adapter."
)]
//! LibSQL/SQLite storage for the rowmap mapper.
//!
//! [`LibsqlStorage`] owns one connection and a current-thread tokio runtime,
//! and blocks on it for every statement so the mapper API stays synchronous.
//! Do not call it from inside another tokio runtime.

mod config;
mod errors;

pub use config::{ConfigError, LibsqlConfig, BUSY_TIMEOUT_VAR, URL_VAR};

#[cfg(feature = "libsql-backend")]
mod backend {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    use libsql::{Connection, Database};
    use rowmap_core::transactions::{Isolation, TransactionDefinition, TransactionManager};
    use rowmap_core::{Outcome, Row, Statement, StorageAdapter, StorageError, StorageResult, Value};
    use rowmap_sql_builder::{render, Placeholder};

    #[cfg(feature = "tracing")]
    use tracing::info;

    use crate::config::LibsqlConfig;
    use crate::errors::classify;

    #[inline]
    #[allow(unused_variables)]
    fn obs_record(op: &str, table: &str, start: Instant, rows: u64, success: bool) {
        let elapsed = start.elapsed().as_millis() as u64;
        #[cfg(feature = "tracing")]
        {
            info!(
                sql_kind = "sql",
                table = table,
                op = op,
                rows = rows,
                elapsed_ms = elapsed,
                success = success,
                "storage op"
            );
        }
        #[cfg(feature = "metrics")]
        {
            metrics::counter!("repo_ops_total", 1, "op" => op.to_string(), "table" => table.to_string(), "success" => success.to_string());
            metrics::histogram!("repo_op_duration_ms", elapsed as f64, "op" => op.to_string(), "table" => table.to_string());
            if !success {
                metrics::counter!("repo_op_errors_total", 1, "op" => op.to_string(), "table" => table.to_string());
            }
        }
    }

    fn begin_sql(isolation: Isolation) -> &'static str {
        match isolation {
            Isolation::Default | Isolation::ReadCommitted => "BEGIN DEFERRED",
            Isolation::RepeatableRead => "BEGIN IMMEDIATE",
            Isolation::Serializable => "BEGIN EXCLUSIVE",
        }
    }

    fn to_libsql_value(v: Value) -> libsql::Value {
        match v {
            Value::String(s) => libsql::Value::Text(s),
            Value::I32(i) => libsql::Value::Integer(i64::from(i)),
            Value::I64(i) => libsql::Value::Integer(i),
            Value::F64(f) => libsql::Value::Real(f),
            Value::Bool(b) => libsql::Value::Integer(i64::from(b)), // SQLite bools are 0/1
            Value::Null => libsql::Value::Null,
        }
    }

    fn from_libsql_value(column: &str, v: libsql::Value) -> StorageResult<Value> {
        match v {
            libsql::Value::Null => Ok(Value::Null),
            libsql::Value::Integer(i) => Ok(Value::I64(i)),
            libsql::Value::Real(f) => Ok(Value::F64(f)),
            libsql::Value::Text(s) => Ok(Value::String(s)),
            libsql::Value::Blob(_) => Err(StorageError::message(format!(
                "column `{}` holds a BLOB, which has no scalar value",
                column
            ))),
        }
    }

    /// A [`StorageAdapter`] and [`TransactionManager`] over a single libsql connection.
    pub struct LibsqlStorage {
        runtime: tokio::runtime::Runtime,
        // Kept alive for the connection.
        _db: Database,
        conn: Connection,
        read_only: AtomicBool,
    }

    impl LibsqlStorage {
        /// Opens the database named by `config` and applies its pragmas.
        ///
        /// # Panics
        ///
        /// Panics if called from within a tokio runtime: every call blocks on
        /// the adapter's own current-thread runtime.
        pub fn open(config: &LibsqlConfig) -> StorageResult<Self> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| StorageError::connection(format!("tokio runtime: {}", e)))?;
            // Database::open is deprecated upstream; keep a narrow allow here until Builder migration
            #[allow(deprecated)]
            let db = Database::open(config.url.as_str()).map_err(|e| {
                StorageError::connection(format!("open `{}`: {}", config.url, e))
            })?;
            let conn = db
                .connect()
                .map_err(|e| StorageError::connection(format!("connect `{}`: {}", config.url, e)))?;
            let storage = Self {
                runtime,
                _db: db,
                conn,
                read_only: AtomicBool::new(false),
            };
            // PRAGMA busy_timeout reports a row, which execute may reject; the setting still applies.
            storage
                .runtime
                .block_on(storage.conn.execute(
                    &format!("PRAGMA busy_timeout = {}", config.busy_timeout_ms),
                    (),
                ))
                .ok();
            Ok(storage)
        }

        /// Opens `url` with the default configuration.
        ///
        /// # Panics
        ///
        /// Panics if called from within a tokio runtime: every call blocks on
        /// the adapter's own current-thread runtime.
        pub fn open_url(url: &str) -> StorageResult<Self> {
            Self::open(&LibsqlConfig::new(url))
        }

        /// Run several `;`-separated statements, typically schema setup.
        pub fn execute_batch(&self, sql: &str) -> StorageResult<()> {
            self.runtime
                .block_on(self.conn.execute_batch(sql))
                .map(|_| ())
                .map_err(classify)
        }

        fn execute_sql(&self, sql: &str) -> StorageResult<u64> {
            self.runtime
                .block_on(self.conn.execute(sql, ()))
                .map_err(classify)
        }

        fn query_rows(&self, sql: &str, params: Vec<libsql::Value>) -> StorageResult<Vec<Row>> {
            self.runtime.block_on(async {
                let mut rows = self.conn.query(sql, params).await.map_err(classify)?;
                let names: Vec<String> = (0..rows.column_count())
                    .map(|i| rows.column_name(i).unwrap_or_default().to_string())
                    .collect();
                let mut out = Vec::new();
                while let Some(row) = rows.next().await.map_err(classify)? {
                    let mut cells = Row::new();
                    for (i, name) in names.iter().enumerate() {
                        let value = row.get_value(i as i32).map_err(classify)?;
                        cells.set(name.as_str(), from_libsql_value(name, value)?);
                    }
                    out.push(cells);
                }
                Ok(out)
            })
        }

        fn run(&self, statement: &Statement<'_>) -> StorageResult<Outcome> {
            let (sql, params) = render(statement, Placeholder::Question);
            let params: Vec<libsql::Value> = params.into_iter().map(to_libsql_value).collect();
            match statement {
                Statement::Select { .. } => self.query_rows(&sql, params).map(Outcome::rows),
                Statement::Insert { .. } => {
                    let affected = self
                        .runtime
                        .block_on(self.conn.execute(&sql, params))
                        .map_err(classify)?;
                    Ok(Outcome {
                        affected,
                        last_insert_id: Some(self.conn.last_insert_rowid()),
                        rows: Vec::new(),
                    })
                }
                Statement::Update { .. } | Statement::Delete { .. } => self
                    .runtime
                    .block_on(self.conn.execute(&sql, params))
                    .map(Outcome::affected)
                    .map_err(classify),
            }
        }

        fn leave_read_only(&self) {
            if self.read_only.swap(false, Ordering::SeqCst) {
                self.execute_sql("PRAGMA query_only = OFF").ok();
            }
        }
    }

    /// Statements are rendered with `?` placeholders and run on the
    /// adapter's runtime.
    ///
    /// # Panics
    ///
    /// Every method panics if called from within a tokio runtime.
    impl StorageAdapter for LibsqlStorage {
        fn execute(&self, statement: &Statement<'_>) -> StorageResult<Outcome> {
            let start = Instant::now();
            let result = self.run(statement);
            let rows = match &result {
                Ok(outcome) if outcome.rows.is_empty() => outcome.affected,
                Ok(outcome) => outcome.rows.len() as u64,
                Err(_) => 0,
            };
            obs_record(statement.op(), statement.table(), start, rows, result.is_ok());
            result
        }
    }

    impl TransactionManager for LibsqlStorage {
        fn begin(&self, def: &TransactionDefinition) -> StorageResult<()> {
            if def.read_only {
                self.execute_sql("PRAGMA query_only = ON")?;
                self.read_only.store(true, Ordering::SeqCst);
            }
            if let Err(e) = self.execute_sql(begin_sql(def.isolation)) {
                self.leave_read_only();
                return Err(e);
            }
            Ok(())
        }

        fn commit(&self) -> StorageResult<()> {
            let result = self.execute_sql("COMMIT").map(|_| ());
            self.leave_read_only();
            result
        }

        fn rollback(&self) -> StorageResult<()> {
            let result = self.execute_sql("ROLLBACK").map(|_| ());
            self.leave_read_only();
            result
        }
    }

    impl std::fmt::Debug for LibsqlStorage {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LibsqlStorage")
                .field("read_only", &self.read_only.load(Ordering::SeqCst))
                .finish_non_exhaustive()
        }
    }
}

#[cfg(feature = "libsql-backend")]
pub use backend::LibsqlStorage;
