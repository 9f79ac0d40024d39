use rowmap_core::{Entity, PropertyCache, Row, Value};
use rowmap_macros::Entity;

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Product {
    id_product: Option<i64>,
    id_category: Option<i64>,
    name: String,
    #[entity(column = "ref")]
    reference: String,
    price: f64,
    #[entity(skip)]
    selected: bool,
    #[entity(cache)]
    cache: PropertyCache,
}

fn main() {
    assert_eq!(Product::TYPE_NAME, "Product");
    assert_eq!(
        Product::COLUMNS,
        &["idProduct", "idCategory", "name", "ref", "price"]
    );

    let mut p = Product {
        name: "Chair".into(),
        reference: "CH-1".into(),
        price: 12.5,
        selected: true,
        ..Product::default()
    };
    assert_eq!(p.key(), None);
    assert_eq!(p.column_value("idProduct"), Some(Value::Null));
    assert_eq!(p.column_value("ref"), Some(Value::from("CH-1")));
    assert_eq!(p.column_value("selected"), None);
    assert!(p.property_cache().is_some());

    let row: Row = [
        ("idProduct", Value::I64(4)),
        ("name", Value::from("Table")),
        ("price", Value::I64(30)),
    ]
    .into_iter()
    .collect();
    p.assign_row(&row).unwrap();
    assert_eq!(p.key(), Some(4));
    assert_eq!(p.name, "Table");
    assert_eq!(p.price, 30.0);
    assert_eq!(p.reference, "CH-1");
    assert!(p.selected);

    p.set_key(None);
    assert_eq!(p.id_product, None);
}
