//! Convention-based mapping between entities and storage rows.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::entity::Entity;
use crate::error::{RepoError, RepoResult, StorageError, UnknownColumn};
use crate::registry::{EntityMeta, Registry};
use crate::statement::{Direction, Limit, SortKey, Statement};
use crate::storage::{Outcome, Row, StorageAdapter};
use crate::value::Value;

#[inline]
#[allow(unused_variables)]
fn obs_record(op: &str, table: &str, start: Instant, rows: u64, success: bool) {
    #[cfg(feature = "tracing")]
    {
        let elapsed = start.elapsed().as_millis() as u64;
        tracing::debug!(
            table = table,
            op = op,
            rows = rows,
            elapsed_ms = elapsed,
            success = success,
            "mapper op"
        );
    }
}

/// Runs entity lifecycle operations against a storage adapter.
///
/// Each call derives one [`Statement`] from the entity's registered metadata
/// and executes it. The mapper holds no state of its own and never manages
/// transactions.
#[derive(Clone, Copy)]
pub struct Mapper<'a> {
    registry: &'a Registry,
    storage: &'a dyn StorageAdapter,
}

impl<'a> Mapper<'a> {
    pub fn new(registry: &'a Registry, storage: &'a dyn StorageAdapter) -> Self {
        Self { registry, storage }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn storage(&self) -> &'a dyn StorageAdapter {
        self.storage
    }

    fn run(&self, op: &str, statement: &Statement<'_>) -> RepoResult<Outcome> {
        let start = Instant::now();
        match self.storage.execute(statement) {
            Ok(outcome) => {
                let rows = match statement {
                    Statement::Select { .. } => outcome.rows.len() as u64,
                    _ => outcome.affected,
                };
                obs_record(op, statement.table(), start, rows, true);
                Ok(outcome)
            }
            Err(e) => {
                obs_record(op, statement.table(), start, 0, false);
                Err(RepoError::Storage(e))
            }
        }
    }

    /// Reload every physical field of `entity` from the row matching its key.
    ///
    /// Returns `Ok(false)` and leaves the entity untouched when no row matches,
    /// which is always the case for an entity without a key.
    pub fn hydrate<E: Entity>(&self, entity: &mut E) -> RepoResult<bool> {
        let meta = self.registry.meta::<E>()?;
        let statement = Statement::Select {
            table: &meta.table,
            filters: vec![(meta.key_column.as_str(), Value::from(entity.key()))],
            order: Vec::new(),
            limit: None,
        };
        let outcome = self.run("hydrate", &statement)?;
        let Some(row) = outcome.rows.first() else {
            return Ok(false);
        };
        ensure_known_columns::<E>(row)?;
        entity.assign_row(row)?;
        if let Some(cache) = entity.property_cache() {
            cache.clear();
        }
        Ok(true)
    }

    /// Insert a transient entity or update a persisted one; returns its key.
    pub fn persist<E: Entity>(&self, entity: &mut E) -> RepoResult<i64> {
        let meta = self.registry.meta::<E>()?;
        match entity.key() {
            None => {
                let values = meta
                    .columns
                    .iter()
                    .map(|column| column_value(entity, meta, column))
                    .collect::<RepoResult<Vec<_>>>()?;
                let statement = Statement::Insert {
                    table: &meta.table,
                    columns: meta.columns.to_vec(),
                    values,
                };
                let outcome = self.run("insert", &statement)?;
                let key = outcome.last_insert_id.ok_or_else(|| {
                    StorageError::message(format!(
                        "storage reported no generated key for `{}`",
                        meta.table
                    ))
                })?;
                entity.set_key(Some(key));
                Ok(key)
            }
            Some(key) => {
                // The key column is assigned its own value alongside the others.
                let assignments = meta
                    .columns
                    .iter()
                    .map(|column| Ok((*column, column_value(entity, meta, column)?)))
                    .collect::<RepoResult<Vec<_>>>()?;
                let statement = Statement::Update {
                    table: &meta.table,
                    assignments,
                    key_column: &meta.key_column,
                    key: Value::I64(key),
                };
                self.run("update", &statement)?;
                Ok(key)
            }
        }
    }

    /// Delete the row of a persisted entity. The instance itself is left as is.
    pub fn remove<E: Entity>(&self, entity: &E) -> RepoResult<bool> {
        let meta = self.registry.meta::<E>()?;
        let Some(key) = entity.key() else {
            return Ok(false);
        };
        let statement = Statement::Delete {
            table: &meta.table,
            key_column: &meta.key_column,
            key: Value::I64(key),
        };
        let outcome = self.run("remove", &statement)?;
        Ok(outcome.affected == 1)
    }

    /// Entities whose columns equal every `(column, value)` filter.
    ///
    /// Filter and sort column names are passed to storage verbatim.
    pub fn find_all_by<E: Entity>(
        &self,
        filters: &[(&str, Value)],
        sort: &[(&str, Direction)],
        limit: Option<Limit>,
    ) -> RepoResult<Vec<E>> {
        let meta = self.registry.meta::<E>()?;
        let statement = Statement::Select {
            table: &meta.table,
            filters: filters.iter().map(|(c, v)| (*c, v.clone())).collect(),
            order: sort
                .iter()
                .map(|(column, direction)| SortKey {
                    column: *column,
                    direction: *direction,
                })
                .collect(),
            limit,
        };
        let outcome = self.run("find_all_by", &statement)?;
        outcome
            .rows
            .iter()
            .map(|row| {
                ensure_known_columns::<E>(row)?;
                let mut entity = E::default();
                entity.assign_row(row)?;
                Ok(entity)
            })
            .collect()
    }

    pub fn find_one_by<E: Entity>(&self, filters: &[(&str, Value)]) -> RepoResult<Option<E>> {
        let found = self.find_all_by(filters, &[], Some(Limit::First(1)))?;
        Ok(found.into_iter().next())
    }

    /// Resolve the computed property `name` of `entity` as a `T`.
    ///
    /// Resolved outcomes are kept in the entity's property cache (when it has
    /// one) until the next successful [`hydrate`](Self::hydrate). Accessor
    /// errors are returned and not cached.
    pub fn property<E, T>(&self, entity: &E, name: &str) -> RepoResult<Option<Arc<T>>>
    where
        E: Entity,
        T: Any + Send + Sync,
    {
        let cache = entity.property_cache();
        let resolved = match cache.and_then(|c| c.get(name)) {
            Some(hit) => hit,
            None => {
                let properties = self.registry.properties::<E>()?;
                let fresh = properties.resolve(name, entity, self).ok_or_else(|| {
                    RepoError::UnknownProperty {
                        type_name: E::TYPE_NAME,
                        property: name.to_string(),
                    }
                })??;
                if let Some(cache) = cache {
                    cache.insert(name, fresh.clone());
                }
                fresh
            }
        };
        match resolved {
            None => Ok(None),
            Some(value) => value
                .downcast::<T>()
                .map(Some)
                .map_err(|_| RepoError::PropertyType {
                    type_name: E::TYPE_NAME,
                    property: name.to_string(),
                }),
        }
    }
}

impl fmt::Debug for Mapper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("registry", self.registry)
            .finish_non_exhaustive()
    }
}

fn column_value<E: Entity>(entity: &E, meta: &EntityMeta, column: &str) -> RepoResult<Value> {
    entity.column_value(column).ok_or_else(|| {
        RepoError::mapping(UnknownColumn {
            type_name: meta.type_name,
            column: column.to_string(),
        })
    })
}

fn ensure_known_columns<E: Entity>(row: &Row) -> RepoResult<()> {
    match row
        .columns()
        .find(|column| !E::COLUMNS.iter().any(|known| known == column))
    {
        Some(column) => Err(RepoError::mapping(UnknownColumn {
            type_name: E::TYPE_NAME,
            column: column.to_string(),
        })),
        None => Ok(()),
    }
}
