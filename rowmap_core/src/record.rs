//! Entity-side lifecycle methods.

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;

use crate::entity::Entity;
use crate::error::{RepoError, RepoResult};
use crate::mapper::Mapper;
use crate::statement::{Direction, Limit};
use crate::value::Value;

/// Lifecycle operations available on every [`Entity`].
///
/// Each method delegates to the corresponding [`Mapper`] operation, so
/// `product.persist(&mapper)` and `mapper.persist(&mut product)` are the same.
pub trait Record: Entity {
    fn hydrate(&mut self, mapper: &Mapper<'_>) -> RepoResult<bool> {
        mapper.hydrate(self)
    }

    fn persist(&mut self, mapper: &Mapper<'_>) -> RepoResult<i64> {
        mapper.persist(self)
    }

    fn remove(&self, mapper: &Mapper<'_>) -> RepoResult<bool> {
        mapper.remove(self)
    }

    fn find_all_by(
        mapper: &Mapper<'_>,
        filters: &[(&str, Value)],
        sort: &[(&str, Direction)],
        limit: Option<Limit>,
    ) -> RepoResult<Vec<Self>> {
        mapper.find_all_by(filters, sort, limit)
    }

    fn find_one_by(mapper: &Mapper<'_>, filters: &[(&str, Value)]) -> RepoResult<Option<Self>> {
        mapper.find_one_by(filters)
    }

    fn property<T: Any + Send + Sync>(
        &self,
        mapper: &Mapper<'_>,
        name: &str,
    ) -> RepoResult<Option<Arc<T>>> {
        mapper.property(self, name)
    }

    /// Name to value mapping of everything the type serializes.
    fn view(&self) -> RepoResult<serde_json::Map<String, serde_json::Value>>
    where
        Self: Serialize,
    {
        use serde::ser::Error as _;

        let value =
            serde_json::to_value(self).map_err(|source| RepoError::Serialization { source })?;
        match value {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(RepoError::Serialization {
                source: serde_json::Error::custom(format!(
                    "`{}` does not serialize to a map",
                    Self::TYPE_NAME
                )),
            }),
        }
    }
}

impl<E: Entity> Record for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::storage::{Outcome, Row};
    use crate::test_support::{widget_row, Scripted, Shelf, Widget};

    #[test]
    fn record_methods_delegate_to_the_mapper() {
        let reg = Registry::builder()
            .register::<Widget>()
            .register::<Shelf>()
            .build()
            .unwrap();
        let db = Scripted::default();
        db.reply(Ok(Outcome::inserted(5)))
            .reply(Ok(Outcome::rows(vec![widget_row(5, None, "Chair", 3.0)])))
            .reply(Ok(Outcome::affected(1)));
        let mapper = Mapper::new(&reg, &db);

        let mut w = Widget {
            name: "Chair".into(),
            price: 3.0,
            ..Widget::default()
        };
        assert_eq!(w.persist(&mapper).unwrap(), 5);
        let found = Widget::find_one_by(&mapper, &[("name", Value::from("Chair"))]).unwrap();
        assert_eq!(found, Some(w.clone()));
        assert!(w.remove(&mapper).unwrap());
        assert_eq!(db.calls(), 3);
    }

    /// Serializes as a bare string rather than a map.
    #[derive(Default)]
    struct Label {
        id_label: Option<i64>,
    }

    impl Serialize for Label {
        fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str("label")
        }
    }

    impl Entity for Label {
        const TYPE_NAME: &'static str = "Label";
        const COLUMNS: &'static [&'static str] = &["idLabel"];

        fn key(&self) -> Option<i64> {
            self.id_label
        }
        fn set_key(&mut self, key: Option<i64>) {
            self.id_label = key;
        }
        fn column_value(&self, column: &str) -> Option<Value> {
            (column == "idLabel").then(|| self.id_label.into())
        }
        fn assign_row(&mut self, _row: &Row) -> RepoResult<()> {
            Ok(())
        }
    }

    #[test]
    fn view_requires_a_map() {
        let err = Label::default().view().unwrap_err();
        assert!(matches!(err, RepoError::Serialization { .. }));
        let source = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(
            source.as_deref(),
            Some("`Label` does not serialize to a map")
        );
    }
}
