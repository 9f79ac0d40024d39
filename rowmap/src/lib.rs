#![forbid(unsafe_code)]
//! Facade crate re-exporting the core traits and the derive macro of `rowmap`.
//!
//! Add this single crate as a dependency; enable `libsql-backend` for the
//! SQLite adapter and `sql-builder` for the statement renderer.
//!
//! # Example: Deriving `Entity`
//!
//! ```ignore
//! // Non-runnable: derive expansions name `::rowmap_core`, which doctests of
//! // this crate cannot see. See the demo under `rowmap/examples/`.
//! use rowmap::{Entity, Mapper, Record, Registry};
//!
//! #[derive(Entity, Debug, Default)]
//! pub struct Category {
//!     // The key column is "id" + type name, here `idCategory`.
//!     pub id_category: Option<i64>,
//!     pub name: String,
//! }
//!
//! let registry = Registry::builder().register::<Category>().build()?;
//! let mapper = Mapper::new(&registry, &storage);
//! let mut c = Category { name: "Furniture".into(), ..Default::default() };
//! let key = c.persist(&mapper)?;
//! ```

// Re-export all core traits and types.
pub use rowmap_core::{
    read_column, ColumnError, Direction, DirectionError, Entity, EntityMeta, FromValue, Limit,
    LimitError, Mapper, Outcome, Properties, PropertyCache, Record, Registry, RegistryBuilder,
    RegistryError, RepoError, RepoResult, Row, SortKey, Statement, StorageAdapter, StorageError,
    StorageResult, UnknownColumn, Value, ValueError,
};

// Re-export the derive macro; it shares the `Entity` name with the trait.
pub use rowmap_macros::Entity;

// Naming conventions and the backend-agnostic transactions API.
pub use rowmap_core::{naming, transactions};

// Optional re-export of the SQL builder helpers.
#[cfg(feature = "sql-builder")]
pub use rowmap_sql_builder as sql_builder;

/// Storage backends enabled through features.
pub mod backends {
    #[cfg(feature = "libsql-backend")]
    pub use rowmap_libsql::{
        ConfigError, LibsqlConfig, LibsqlStorage, BUSY_TIMEOUT_VAR, URL_VAR,
    };
}
