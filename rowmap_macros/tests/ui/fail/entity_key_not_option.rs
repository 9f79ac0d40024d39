use rowmap_macros::Entity;

#[derive(Entity, Default)]
struct Category {
    id_category: i64,
    name: String,
}

fn main() {}
