//! Read-only entity metadata, built once at startup.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::entity::Entity;
use crate::error::{RepoError, RepoResult};
use crate::naming;
use crate::properties::Properties;

/// Storage names derived for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMeta {
    pub type_name: &'static str,
    pub table: String,
    pub key_column: String,
    pub columns: &'static [&'static str],
}

impl EntityMeta {
    fn of<E: Entity>() -> Self {
        Self {
            type_name: E::TYPE_NAME,
            table: naming::table_name(E::TYPE_NAME),
            key_column: naming::key_column(E::TYPE_NAME),
            columns: E::COLUMNS,
        }
    }
}

/// Problems detected while building a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("entity type `{type_name}` is registered twice")]
    Duplicate { type_name: &'static str },
    #[error("`{type_name}` has no key column `{key_column}`")]
    MissingKeyColumn {
        type_name: &'static str,
        key_column: String,
    },
    #[error("`{type_name}` declares column `{column}` more than once")]
    DuplicateColumn {
        type_name: &'static str,
        column: &'static str,
    },
    #[error("`{ident}` in `{type_name}` is not a valid identifier; use ASCII letters, digits, or `_`, starting with a letter or `_`")]
    InvalidIdentifier {
        type_name: &'static str,
        ident: String,
    },
    #[error("computed property `{property}` of `{type_name}` shadows a column")]
    PropertyShadowsColumn {
        type_name: &'static str,
        property: &'static str,
    },
    #[error("computed property `{property}` of `{type_name}` is registered twice")]
    DuplicateProperty {
        type_name: &'static str,
        property: &'static str,
    },
}

struct Registered {
    meta: EntityMeta,
    property_names: Vec<&'static str>,
    // Always a `Properties<E>` for the entry's type.
    properties: Box<dyn Any + Send + Sync>,
}

/// Metadata and computed properties of every entity type a [`Mapper`](crate::Mapper) may handle.
///
/// Immutable once built and safe to share between threads.
pub struct Registry {
    entries: HashMap<TypeId, Registered>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn meta<E: Entity>(&self) -> RepoResult<&EntityMeta> {
        self.entries
            .get(&TypeId::of::<E>())
            .map(|r| &r.meta)
            .ok_or(RepoError::Unregistered {
                type_name: E::TYPE_NAME,
            })
    }

    pub fn contains<E: Entity>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<E>())
    }

    pub(crate) fn properties<E: Entity>(&self) -> RepoResult<&Properties<E>> {
        let entry = self
            .entries
            .get(&TypeId::of::<E>())
            .ok_or(RepoError::Unregistered {
                type_name: E::TYPE_NAME,
            })?;
        entry
            .properties
            .downcast_ref::<Properties<E>>()
            .ok_or(RepoError::Unregistered {
                type_name: E::TYPE_NAME,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata of every registered type, sorted by type name.
    pub fn metas(&self) -> Vec<&EntityMeta> {
        let mut metas: Vec<&EntityMeta> = self.entries.values().map(|r| &r.meta).collect();
        metas.sort_by_key(|m| m.type_name);
        metas
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<&Registered> = self.entries.values().collect();
        entries.sort_by_key(|r| r.meta.type_name);
        let mut map = f.debug_map();
        for r in entries {
            map.entry(&r.meta.table, &r.property_names);
        }
        map.finish()
    }
}

/// Collects entity types; validation happens in [`build`](RegistryBuilder::build).
#[derive(Default)]
pub struct RegistryBuilder {
    pending: Vec<(TypeId, Registered)>,
}

impl RegistryBuilder {
    /// Register `E` without computed properties.
    pub fn register<E: Entity>(self) -> Self {
        self.register_with::<E>(Properties::new())
    }

    pub fn register_with<E: Entity>(mut self, properties: Properties<E>) -> Self {
        let registered = Registered {
            meta: EntityMeta::of::<E>(),
            property_names: properties.names().collect(),
            properties: Box::new(properties),
        };
        self.pending.push((TypeId::of::<E>(), registered));
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut entries = HashMap::with_capacity(self.pending.len());
        for (type_id, registered) in self.pending {
            validate(&registered)?;
            if entries.contains_key(&type_id) {
                return Err(RegistryError::Duplicate {
                    type_name: registered.meta.type_name,
                });
            }
            entries.insert(type_id, registered);
        }
        Ok(Registry { entries })
    }
}

fn validate(registered: &Registered) -> Result<(), RegistryError> {
    let meta = &registered.meta;
    let type_name = meta.type_name;
    let invalid = |ident: &str| RegistryError::InvalidIdentifier {
        type_name,
        ident: ident.to_string(),
    };

    if !naming::is_valid_ident(&meta.table) {
        return Err(invalid(&meta.table));
    }
    let mut seen = HashSet::with_capacity(meta.columns.len());
    for column in meta.columns {
        if !naming::is_valid_ident(column) {
            return Err(invalid(column));
        }
        if !seen.insert(*column) {
            return Err(RegistryError::DuplicateColumn {
                type_name,
                column: *column,
            });
        }
    }
    if !seen.contains(meta.key_column.as_str()) {
        return Err(RegistryError::MissingKeyColumn {
            type_name,
            key_column: meta.key_column.clone(),
        });
    }

    let mut names = HashSet::with_capacity(registered.property_names.len());
    for property in &registered.property_names {
        if seen.contains(property) {
            return Err(RegistryError::PropertyShadowsColumn {
                type_name,
                property: *property,
            });
        }
        if !names.insert(*property) {
            return Err(RegistryError::DuplicateProperty {
                type_name,
                property: *property,
            });
        }
    }
    Ok(())
}
