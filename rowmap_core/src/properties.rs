//! Computed (non-column) properties resolved on demand.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::RepoResult;
use crate::mapper::Mapper;

pub(crate) type Resolved = Option<Arc<dyn Any + Send + Sync>>;

type Accessor<E> = Box<dyn Fn(&E, &Mapper<'_>) -> RepoResult<Resolved> + Send + Sync>;

/// Named accessors for the computed properties of entity type `E`.
///
/// ```ignore
/// let props = Properties::<Product>::new().with("category", |p: &Product, m: &Mapper<'_>| {
///     match p.id_category {
///         Some(id) => Category::find_one_by(m, &[("idCategory", id.into())]),
///         None => Ok(None),
///     }
/// });
/// ```
pub struct Properties<E> {
    accessors: Vec<(&'static str, Accessor<E>)>,
}

impl<E: Entity> Properties<E> {
    pub fn new() -> Self {
        Self {
            accessors: Vec::new(),
        }
    }

    /// Register `accessor` under `name`. It returns `Ok(None)` when there is
    /// nothing to resolve (for instance an unset foreign key).
    pub fn with<T, F>(mut self, name: &'static str, accessor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&E, &Mapper<'_>) -> RepoResult<Option<T>> + Send + Sync + 'static,
    {
        let erased: Accessor<E> = Box::new(move |entity: &E, mapper: &Mapper<'_>| {
            let value = accessor(entity, mapper)?;
            Ok(value.map(|v| Arc::new(v) as Arc<dyn Any + Send + Sync>))
        });
        self.accessors.push((name, erased));
        self
    }

    /// Registered property names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.accessors.iter().map(|(name, _)| *name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.accessors.iter().any(|(n, _)| *n == name)
    }

    pub(crate) fn resolve(
        &self,
        name: &str,
        entity: &E,
        mapper: &Mapper<'_>,
    ) -> Option<RepoResult<Resolved>> {
        self.accessors
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, accessor)| accessor(entity, mapper))
    }
}

impl<E: Entity> Default for Properties<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for Properties<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Widget;

    #[test]
    fn names_keep_registration_order() {
        let props = Properties::<Widget>::new()
            .with("label", |w: &Widget, _: &Mapper<'_>| Ok(Some(w.name.clone())))
            .with("cents", |w: &Widget, _: &Mapper<'_>| {
                Ok(Some((w.price * 100.0) as i64))
            });
        assert_eq!(props.names().collect::<Vec<_>>(), vec!["label", "cents"]);
        assert!(props.contains("cents"));
        assert!(!props.contains("shelf"));
        assert_eq!(format!("{:?}", props), r#"["label", "cents"]"#);
    }
}
