use rowmap_macros::Entity;

#[derive(Entity, Default)]
struct Product {
    id: Option<i64>,
    name: String,
}

fn main() {}
