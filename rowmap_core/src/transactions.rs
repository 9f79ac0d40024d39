//! Backend-agnostic transaction abstractions modeled after Spring's TransactionTemplate.
//!
//! The mapper never starts or ends a transaction. Callers scope one around a
//! group of mapper operations with [`TransactionTemplate::execute`]; the
//! storage adapter provides the [`TransactionManager`].

use crate::error::{RepoResult, StorageResult};

/// Transaction isolation level (best-effort across backends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Isolation {
    #[default]
    Default,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Transaction definition describing desired semantics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionDefinition {
    pub isolation: Isolation,
    pub read_only: bool,
}

impl TransactionDefinition {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }
}

/// Mutable status of the running transaction, handed to the template callback.
#[derive(Debug, Default)]
pub struct TransactionStatus {
    new: bool,
    rollback_only: bool,
}

impl TransactionStatus {
    pub fn new(is_new: bool) -> Self {
        Self {
            new: is_new,
            rollback_only: false,
        }
    }
    pub fn is_new_transaction(&self) -> bool {
        self.new
    }
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }
    /// Roll back at the end of the callback even if it returns `Ok`.
    pub fn set_rollback_only(&mut self) {
        self.rollback_only = true;
    }
}

/// Backend-implemented transaction control on the adapter's connection.
pub trait TransactionManager {
    fn begin(&self, def: &TransactionDefinition) -> StorageResult<()>;
    fn commit(&self) -> StorageResult<()>;
    fn rollback(&self) -> StorageResult<()>;
}

impl<M: TransactionManager + ?Sized> TransactionManager for &M {
    fn begin(&self, def: &TransactionDefinition) -> StorageResult<()> {
        (**self).begin(def)
    }
    fn commit(&self) -> StorageResult<()> {
        (**self).commit()
    }
    fn rollback(&self) -> StorageResult<()> {
        (**self).rollback()
    }
}

/// Runs a callback inside a transaction: commit on `Ok`, roll back on `Err`
/// or when the callback marked the status rollback-only.
#[derive(Debug)]
pub struct TransactionTemplate<M: TransactionManager> {
    manager: M,
    defaults: TransactionDefinition,
}

impl<M: TransactionManager> TransactionTemplate<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            defaults: TransactionDefinition::default(),
        }
    }

    pub fn with_defaults(mut self, def: TransactionDefinition) -> Self {
        self.defaults = def;
        self
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn execute<R, F>(&self, f: F) -> RepoResult<R>
    where
        F: FnOnce(&mut TransactionStatus) -> RepoResult<R>,
    {
        self.execute_with(&self.defaults, f)
    }

    pub fn execute_with<R, F>(&self, def: &TransactionDefinition, f: F) -> RepoResult<R>
    where
        F: FnOnce(&mut TransactionStatus) -> RepoResult<R>,
    {
        self.manager.begin(def)?;
        let mut status = TransactionStatus::new(true);
        match f(&mut status) {
            Ok(value) if status.is_rollback_only() => {
                self.manager.rollback()?;
                Ok(value)
            }
            Ok(value) => {
                if let Err(e) = self.manager.commit() {
                    self.rollback_after_failure();
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                self.rollback_after_failure();
                Err(e)
            }
        }
    }

    // The callback's error wins over a failed rollback.
    fn rollback_after_failure(&self) {
        if let Err(_e) = self.manager.rollback() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "rollback failed");
        }
    }
}
