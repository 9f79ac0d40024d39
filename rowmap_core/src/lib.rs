#![forbid(unsafe_code)]
//! Core of the rowmap entity mapper.
//!
//! Entity types describe their columns through [`Entity`] (usually derived),
//! are registered once in a [`Registry`], and are loaded, stored and queried
//! through a [`Mapper`] wrapping any [`StorageAdapter`]. This crate knows no
//! SQL dialect and no database driver.

pub mod entity;
pub mod error;
pub mod mapper;
pub mod naming;
pub mod properties;
pub mod record;
pub mod registry;
pub mod statement;
pub mod storage;
pub mod transactions;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use entity::{read_column, Entity, PropertyCache};
pub use error::{
    ColumnError, RepoError, RepoResult, StorageError, StorageResult, UnknownColumn,
};
pub use mapper::Mapper;
pub use properties::Properties;
pub use record::Record;
pub use registry::{EntityMeta, Registry, RegistryBuilder, RegistryError};
pub use statement::{Direction, DirectionError, Limit, LimitError, SortKey, Statement};
pub use storage::{Outcome, Row, StorageAdapter};
pub use value::{FromValue, Value, ValueError};
