use rowmap_macros::Entity;

#[derive(Entity, Default)]
struct User {
    id_user: Option<i64>,
    #[entity(rename = "login")]
    log: String,
}

fn main() {}
