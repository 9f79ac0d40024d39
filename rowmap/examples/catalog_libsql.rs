// Run with:
//   cargo run -p rowmap --features libsql-backend,never-demo --example catalog_libsql
// Stores a small catalog in SQLite, walks a lazy relation, and rolls back a
// failed transaction. Set ROWMAP_DATABASE_URL to keep the data in a file.

extern crate rowmap as rowmap_core;

use rowmap::backends::{LibsqlConfig, LibsqlStorage};
use rowmap::transactions::TransactionTemplate;
use rowmap::{Direction, Entity, Mapper, Properties, PropertyCache, Record, Registry, Value};

#[derive(Entity, Clone, Debug, Default, PartialEq)]
pub struct Category {
    pub id_category: Option<i64>,
    pub name: String,
}

#[derive(Entity, Clone, Debug, Default, PartialEq)]
pub struct Product {
    pub id_product: Option<i64>,
    pub id_category: Option<i64>,
    pub name: String,
    #[entity(column = "ref")]
    pub reference: String,
    pub price: f64,
    #[entity(cache)]
    pub cache: PropertyCache,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS category (
    idCategory INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS product (
    idProduct INTEGER PRIMARY KEY AUTOINCREMENT,
    idCategory INTEGER,
    name TEXT NOT NULL,
    ref TEXT NOT NULL UNIQUE,
    price REAL NOT NULL
);";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = LibsqlConfig::from_env()?;
    let storage = LibsqlStorage::open(&config)?;
    storage.execute_batch(SCHEMA)?;

    let registry = Registry::builder()
        .register::<Category>()
        .register_with(Properties::<Product>::new().with(
            "category",
            |p: &Product, m: &Mapper<'_>| match p.id_category {
                Some(id) => Category::find_one_by(m, &[("idCategory", Value::I64(id))]),
                None => Ok(None),
            },
        ))
        .build()?;
    let mapper = Mapper::new(&registry, &storage);

    let mut furniture = Category {
        name: "Furniture".into(),
        ..Default::default()
    };
    furniture.persist(&mapper)?;
    for (name, reference, price) in [("Chair", "CH-1", 49.0), ("Table", "TA-1", 180.0)] {
        let mut p = Product {
            id_category: furniture.id_category,
            name: name.into(),
            reference: reference.into(),
            price,
            ..Default::default()
        };
        p.persist(&mapper)?;
    }

    let products = Product::find_all_by(
        &mapper,
        &[("idCategory", Value::from(furniture.id_category))],
        &[("price", Direction::Desc)],
        None,
    )?;
    for p in &products {
        let category = p.property::<Category>(&mapper, "category")?;
        println!(
            "{} ({}) {:.2} in {}",
            p.name,
            p.reference,
            p.price,
            category.map(|c| c.name.clone()).unwrap_or_default()
        );
    }

    let tx = TransactionTemplate::new(&storage);
    let failed = tx.execute(|_status| {
        let mut copy = Product {
            name: "Chair copy".into(),
            reference: "CH-1".into(),
            ..Default::default()
        };
        copy.persist(&mapper)
    });
    println!("duplicate ref rolled back: {:?}", failed.err());
    println!(
        "{} products in {}",
        Product::find_all_by(&mapper, &[], &[], None)?.len(),
        Product::TYPE_NAME
    );
    Ok(())
}
