use rowmap_macros::Entity;

#[derive(Entity, Default)]
struct User {
    id_user: Option<i64>,
    #[entity(column = "log")]
    login: String,
    log: String,
}

fn main() {}
