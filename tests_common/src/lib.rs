//! Common integration testing utilities and generic tests reusable across backends.

use std::cell::Cell;

use rowmap::transactions::{TransactionManager, TransactionTemplate};
use rowmap::{
    Direction, Entity, Limit, Mapper, Outcome, Properties, PropertyCache, Record, Registry,
    RegistryError, RepoError, RepoResult, Statement, StorageAdapter, StorageError, StorageResult,
    Value,
};
use serde::Serialize;

pub mod memory;

pub use memory::MemoryStorage;

#[derive(Entity, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id_category: Option<i64>,
    pub name: String,
}

#[derive(Entity, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id_product: Option<i64>,
    pub id_category: Option<i64>,
    pub name: String,
    #[entity(column = "ref")]
    #[serde(rename = "ref")]
    pub reference: String,
    pub price: f64,
    #[entity(cache)]
    #[serde(skip)]
    pub cache: PropertyCache,
}

#[derive(Entity, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id_user: Option<i64>,
    pub log: String,
    #[serde(skip_serializing)]
    pub pwd: String,
    pub last_name: String,
    pub first_name: String,
}

/// The catalog entities with their computed properties:
/// `Product.category` and `Category.productCount`.
pub fn catalog_registry() -> Result<Registry, RegistryError> {
    Registry::builder()
        .register_with(
            Properties::<Category>::new().with(
                "productCount",
                |c: &Category, m: &Mapper<'_>| match c.id_category {
                    Some(id) => Product::find_all_by(m, &[("idCategory", Value::I64(id))], &[], None)
                        .map(|products| Some(products.len())),
                    None => Ok(None),
                },
            ),
        )
        .register_with(Properties::<Product>::new().with(
            "category",
            |p: &Product, m: &Mapper<'_>| match p.id_category {
                Some(id) => Category::find_one_by(m, &[("idCategory", Value::I64(id))]),
                None => Ok(None),
            },
        ))
        .register::<User>()
        .build()
}

/// Expose migration SQL via constants for harnesses.
pub mod migrations {
    pub const LIBSQL_CATALOG_SQL: &str = include_str!("../migrations/libsql/001_catalog.sql");
}

/// An empty in-memory catalog with the same unique columns as the SQL schema.
pub fn memory_catalog() -> MemoryStorage {
    MemoryStorage::from_registry(&registry())
        .with_unique("product", "ref")
        .with_unique("user", "log")
}

/// Counts the statements passed through to `inner`.
#[derive(Debug)]
pub struct Counting<S> {
    inner: S,
    calls: Cell<usize>,
}

impl<S> Counting<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<S: StorageAdapter> StorageAdapter for Counting<S> {
    fn execute(&self, statement: &Statement<'_>) -> StorageResult<Outcome> {
        self.calls.set(self.calls.get() + 1);
        self.inner.execute(statement)
    }
}

pub trait StorageFactory {
    type Storage: StorageAdapter + TransactionManager;

    /// Construct a clean store holding the empty catalog schema.
    fn open(&self) -> RepoResult<Self::Storage>;
}

/// Storage for the in-memory adapter.
pub struct MemoryFactory;

impl StorageFactory for MemoryFactory {
    type Storage = MemoryStorage;

    fn open(&self) -> RepoResult<MemoryStorage> {
        Ok(memory_catalog())
    }
}

fn registry() -> Registry {
    catalog_registry().expect("catalog registry is valid")
}

pub fn product(name: &str, reference: &str, price: f64, id_category: Option<i64>) -> Product {
    Product {
        id_category,
        name: name.to_string(),
        reference: reference.to_string(),
        price,
        ..Product::default()
    }
}

fn names(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.name.as_str()).collect()
}

/// Generic CRUD roundtrip test.
pub fn test_crud_roundtrip<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let mapper = Mapper::new(&registry, &storage);

    let mut chair = product("Chair", "CH-1", 12.5, Some(3));
    let key = chair.persist(&mapper)?;
    assert!(key > 0);
    assert_eq!(chair.id_product, Some(key));

    let mut loaded = Product {
        id_product: Some(key),
        ..Product::default()
    };
    assert!(loaded.hydrate(&mapper)?);
    assert_eq!(loaded, chair);

    loaded.name = "Table".into();
    assert_eq!(loaded.persist(&mapper)?, key);
    let mut again = Product {
        id_product: Some(key),
        ..Product::default()
    };
    assert!(again.hydrate(&mapper)?);
    assert_eq!(again.name, "Table");
    assert_eq!(again.reference, "CH-1");

    assert!(again.remove(&mapper)?);
    assert!(!again.remove(&mapper)?);
    // The instance survives its row.
    assert_eq!(again.id_product, Some(key));
    let mut gone = Product {
        id_product: Some(key),
        ..Product::default()
    };
    assert!(!gone.hydrate(&mapper)?);
    Ok(())
}

/// Hydrating a missing or unset key reports `false` and changes nothing.
pub fn test_hydrate_missing<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let mapper = Mapper::new(&registry, &storage);
    product("Chair", "CH-1", 12.5, None).persist(&mapper)?;

    let mut missing = Product {
        id_product: Some(999),
        name: "untouched".into(),
        price: 1.5,
        ..Product::default()
    };
    let before = missing.clone();
    assert!(!missing.hydrate(&mapper)?);
    assert_eq!(missing, before);

    let mut transient = product("Draft", "DR-1", 2.0, None);
    assert!(!transient.hydrate(&mapper)?);
    assert_eq!(transient.name, "Draft");
    Ok(())
}

/// With no filters, sort keys or limit every row comes back.
pub fn test_find_all<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let mapper = Mapper::new(&registry, &storage);
    assert!(Product::find_all_by(&mapper, &[], &[], None)?.is_empty());

    for (i, name) in ["Chair", "Table", "Lamp"].iter().enumerate() {
        product(name, &format!("R-{}", i), 10.0, Some(1)).persist(&mapper)?;
    }
    let mut all = Product::find_all_by(&mapper, &[], &[], None)?;
    assert_eq!(all.len(), 3);
    all.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(names(&all), vec!["Chair", "Lamp", "Table"]);
    assert!(all.iter().all(|p| p.id_product.is_some()));

    let none = Product::find_all_by(&mapper, &[("idCategory", Value::I64(2))], &[], None)?;
    assert!(none.is_empty());
    Ok(())
}

/// Filters are ANDed and sort keys apply in order.
pub fn test_filter_and_sort<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let mapper = Mapper::new(&registry, &storage);
    let rows = [
        ("b", 2, 5.0),
        ("a", 1, 5.0),
        ("d", 2, 7.0),
        ("c", 1, 7.0),
        ("e", 2, 5.0),
    ];
    for (i, (name, cat, price)) in rows.iter().enumerate() {
        product(name, &format!("S-{}", i), *price, Some(*cat)).persist(&mapper)?;
    }

    let sorted = Product::find_all_by(
        &mapper,
        &[],
        &[("idCategory", Direction::Asc), ("name", Direction::Desc)],
        None,
    )?;
    assert_eq!(names(&sorted), vec!["c", "a", "e", "d", "b"]);

    let filtered = Product::find_all_by(
        &mapper,
        &[("idCategory", Value::I64(2)), ("price", Value::F64(5.0))],
        &[("name", Direction::Asc)],
        None,
    )?;
    assert_eq!(names(&filtered), vec!["b", "e"]);
    Ok(())
}

/// A `"2,5"` window skips two rows and returns the next five.
pub fn test_window_limit<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let mapper = Mapper::new(&registry, &storage);
    for i in [7, 2, 9, 0, 4, 1, 8, 3, 6, 5] {
        product(&format!("p{:02}", i), &format!("W-{}", i), 1.0, Some(3)).persist(&mapper)?;
    }
    product("p00-other", "W-x", 1.0, Some(4)).persist(&mapper)?;

    let limit = Limit::from_token("2,5").expect("valid token");
    let page = Product::find_all_by(
        &mapper,
        &[("idCategory", Value::I64(3))],
        &[("name", Direction::Asc)],
        limit,
    )?;
    assert_eq!(names(&page), vec!["p02", "p03", "p04", "p05", "p06"]);

    let first = Product::find_all_by(
        &mapper,
        &[("idCategory", Value::I64(3))],
        &[("name", Direction::Desc)],
        Some(Limit::First(2)),
    )?;
    assert_eq!(names(&first), vec!["p09", "p08"]);
    Ok(())
}

/// `find_one_by` is the first row of a `LIMIT 1` search.
pub fn test_find_one_by<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let mapper = Mapper::new(&registry, &storage);
    let mut user = User {
        log: "jdoe".into(),
        pwd: "$2y$10$hash".into(),
        last_name: "Doe".into(),
        first_name: "Jane".into(),
        ..User::default()
    };
    user.persist(&mapper)?;

    let filters = [("log", Value::from("jdoe"))];
    let one = User::find_one_by(&mapper, &filters)?;
    let first = User::find_all_by(&mapper, &filters, &[], Some(Limit::First(1)))?
        .into_iter()
        .next();
    assert_eq!(one, first);
    assert_eq!(one, Some(user));

    assert_eq!(User::find_one_by(&mapper, &[("log", Value::from("nobody"))])?, None);
    Ok(())
}

/// Removing a transient entity reports `false` without touching storage.
pub fn test_remove_transient<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let counting = Counting::new(&storage);
    let mapper = Mapper::new(&registry, &counting);

    assert!(!product("Draft", "DR-1", 1.0, None).remove(&mapper)?);
    assert_eq!(counting.calls(), 0);
    Ok(())
}

/// Computed properties resolve once per instance until the next hydrate.
pub fn test_lazy_relation<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let counting = Counting::new(&storage);
    let mapper = Mapper::new(&registry, &counting);

    let mut furniture = Category {
        name: "Furniture".into(),
        ..Category::default()
    };
    furniture.persist(&mapper)?;
    let mut chair = product("Chair", "CH-1", 12.5, furniture.id_category);
    chair.persist(&mapper)?;

    let before = counting.calls();
    let category = chair.property::<Category>(&mapper, "category")?;
    assert_eq!(category.map(|c| c.name.clone()), Some("Furniture".to_string()));
    assert_eq!(counting.calls(), before + 1);
    chair.property::<Category>(&mapper, "category")?;
    assert_eq!(counting.calls(), before + 1);
    assert!(chair.cache.is_resolved("category"));

    furniture.name = "Seating".into();
    furniture.persist(&mapper)?;
    let stale = chair.property::<Category>(&mapper, "category")?;
    assert_eq!(stale.map(|c| c.name.clone()), Some("Furniture".to_string()));

    assert!(chair.hydrate(&mapper)?);
    assert!(!chair.cache.is_resolved("category"));
    let fresh = chair.property::<Category>(&mapper, "category")?;
    assert_eq!(fresh.map(|c| c.name.clone()), Some("Seating".to_string()));

    assert!(matches!(
        chair.property::<Category>(&mapper, "supplier"),
        Err(RepoError::UnknownProperty { .. })
    ));
    assert!(matches!(
        chair.property::<String>(&mapper, "category"),
        Err(RepoError::PropertyType { .. })
    ));

    let orphan = product("Stray", "ST-1", 1.0, None);
    assert!(orphan.property::<Category>(&mapper, "category")?.is_none());

    let count = furniture.property::<usize>(&mapper, "productCount")?;
    assert_eq!(count.as_deref(), Some(&1));
    Ok(())
}

/// Unique violations surface as constraint errors naming the column.
pub fn test_constraint_violation<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let mapper = Mapper::new(&registry, &storage);
    product("Chair", "CH-1", 12.5, None).persist(&mapper)?;

    let mut copy = product("Other chair", "CH-1", 9.0, None);
    match copy.persist(&mapper) {
        Err(RepoError::Storage(StorageError::ConstraintViolation { column, .. })) => {
            assert_eq!(column.as_deref(), Some("ref"));
        }
        other => panic!("expected a constraint violation, got {:?}", other),
    }
    assert_eq!(copy.id_product, None);
    assert_eq!(Product::find_all_by(&mapper, &[], &[], None)?.len(), 1);
    Ok(())
}

/// A template rolls back the mapper's writes when the closure fails.
pub fn test_transaction_rollback<F: StorageFactory>(f: &F) -> RepoResult<()> {
    let registry = registry();
    let storage = f.open()?;
    let mapper = Mapper::new(&registry, &storage);
    let tx = TransactionTemplate::new(&storage);

    let failed: RepoResult<()> = tx.execute(|_status| {
        product("Chair", "TX-1", 1.0, None).persist(&mapper)?;
        product("Copy", "TX-1", 1.0, None).persist(&mapper)?;
        Ok(())
    });
    assert!(failed.is_err());
    assert!(Product::find_all_by(&mapper, &[], &[], None)?.is_empty());

    let key = tx.execute(|_status| product("Chair", "TX-1", 1.0, None).persist(&mapper))?;
    assert!(key > 0);

    tx.execute(|status| {
        product("Lamp", "TX-2", 1.0, None).persist(&mapper)?;
        status.set_rollback_only();
        Ok(())
    })?;
    let all = Product::find_all_by(&mapper, &[], &[], None)?;
    assert_eq!(names(&all), vec!["Chair"]);
    Ok(())
}

/// Run every suite above against storage from `f`.
pub fn run_all<F: StorageFactory>(f: &F) -> RepoResult<()> {
    test_crud_roundtrip(f)?;
    test_hydrate_missing(f)?;
    test_find_all(f)?;
    test_filter_and_sort(f)?;
    test_window_limit(f)?;
    test_find_one_by(f)?;
    test_remove_transient(f)?;
    test_lazy_relation(f)?;
    test_constraint_violation(f)?;
    test_transaction_rollback(f)
}

/// Property: persisting then hydrating by the assigned key reproduces every
/// physical field.
pub fn prop_persist_hydrate_roundtrip<F: StorageFactory>(f: &F, cases: u32) {
    use proptest::prelude::*;
    use proptest::test_runner::{Config, TestCaseError, TestRunner};

    let registry = registry();
    let storage = f.open().expect("open storage");
    let mapper = Mapper::new(&registry, &storage);
    let seq = Cell::new(0_u32);
    let fail = |e: RepoError| TestCaseError::fail(e.to_string());

    let mut runner = TestRunner::new(Config {
        cases,
        ..Config::default()
    });
    let strategy = (
        "[A-Za-z][A-Za-z0-9 ]{0,23}",
        -1.0e6_f64..1.0e6,
        proptest::option::of(1_i64..100),
    );
    let result = runner.run(&strategy, |(name, price, id_category)| {
        let n = seq.get();
        seq.set(n + 1);
        let mut original = product(&name, &format!("P-{}", n), price, id_category);
        let key = original.persist(&mapper).map_err(fail)?;

        let mut back = Product {
            id_product: Some(key),
            ..Product::default()
        };
        prop_assert!(back.hydrate(&mapper).map_err(fail)?);
        prop_assert_eq!(back, original);
        Ok(())
    });
    if let Err(e) = result {
        panic!("{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_metadata() {
        assert_eq!(
            Product::COLUMNS,
            &["idProduct", "idCategory", "name", "ref", "price"]
        );
        assert_eq!(Category::COLUMNS, &["idCategory", "name"]);
        assert_eq!(
            User::COLUMNS,
            &["idUser", "log", "pwd", "lastName", "firstName"]
        );
        let registry = catalog_registry().unwrap();
        let tables: Vec<_> = registry.metas().iter().map(|m| m.table.clone()).collect();
        assert_eq!(tables, vec!["category", "product", "user"]);
    }

    #[test]
    fn migrations_cover_every_table() {
        let sql = migrations::LIBSQL_CATALOG_SQL;
        let registry = catalog_registry().unwrap();
        for meta in registry.metas() {
            assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", meta.table)));
            for column in meta.columns {
                assert!(sql.contains(column), "{} missing from schema", column);
            }
        }
    }

    #[test]
    fn view_follows_serde_attributes() {
        let user = User {
            id_user: Some(4),
            log: "jdoe".into(),
            pwd: "secret".into(),
            last_name: "Doe".into(),
            first_name: "Jane".into(),
        };
        let view = user.view().unwrap();
        assert_eq!(
            view.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["firstName", "idUser", "lastName", "log"]
        );
        assert_eq!(view["idUser"], serde_json::json!(4));

        let chair = product("Chair", "CH-1", 12.5, None);
        let view = chair.view().unwrap();
        assert_eq!(view["ref"], serde_json::json!("CH-1"));
        assert_eq!(view["idProduct"], serde_json::Value::Null);
        assert!(!view.contains_key("cache"));
    }

    #[test]
    fn memory_crud_roundtrip() {
        test_crud_roundtrip(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_hydrate_missing() {
        test_hydrate_missing(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_find_all() {
        test_find_all(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_filter_and_sort() {
        test_filter_and_sort(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_window_limit() {
        test_window_limit(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_find_one_by() {
        test_find_one_by(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_remove_transient() {
        test_remove_transient(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_lazy_relation() {
        test_lazy_relation(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_constraint_violation() {
        test_constraint_violation(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_transaction_rollback() {
        test_transaction_rollback(&MemoryFactory).unwrap();
    }

    #[test]
    fn memory_roundtrip_property() {
        prop_persist_hydrate_roundtrip(&MemoryFactory, 64);
    }

    #[test]
    fn memory_catalog_matches_the_registry() {
        let storage = memory_catalog();
        for meta in registry().metas() {
            assert!(storage.rows(&meta.table).is_empty());
        }
        let mapper_registry = registry();
        let mapper = Mapper::new(&mapper_registry, &storage);
        let mut first = User {
            log: "jdoe".into(),
            ..User::default()
        };
        first.persist(&mapper).unwrap();
        let err = User {
            log: "jdoe".into(),
            ..User::default()
        }
        .persist(&mapper)
        .unwrap_err();
        assert_eq!(err.storage().and_then(StorageError::column), Some("log"));
    }

    #[test]
    fn storage_failures_pass_through() {
        let registry = registry();
        let storage = memory_catalog();
        let mapper = Mapper::new(&registry, &storage);
        storage.fail_next(StorageError::connection("socket closed"));
        let err = product("Chair", "CH-1", 1.0, None)
            .persist(&mapper)
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::Storage(StorageError::ConnectionFailure { .. })
        ));
        assert_eq!(storage.statements(), vec!["insert product"]);
    }

    #[test]
    fn update_rewrites_the_key_with_itself() {
        let registry = registry();
        let storage = memory_catalog();
        let mapper = Mapper::new(&registry, &storage);
        let mut chair = product("Chair", "CH-1", 1.0, None);
        let key = chair.persist(&mapper).unwrap();
        chair.price = 2.0;
        chair.persist(&mapper).unwrap();
        let rows = storage.rows("product");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("idProduct"), Some(&Value::I64(key)));
        assert_eq!(rows[0].get("price"), Some(&Value::F64(2.0)));
    }
}
