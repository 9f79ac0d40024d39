use rowmap_core::Entity;
use rowmap_macros::Entity;

#[derive(Entity, Default, serde::Serialize)]
struct User {
    id_user: Option<i64>,
    log: String,
    #[serde(skip_serializing)]
    pwd: String,
    last_name: Option<String>,
}

fn main() {
    assert_eq!(User::COLUMNS, &["idUser", "log", "pwd", "lastName"]);
    let u = User {
        id_user: Some(1),
        last_name: None,
        ..User::default()
    };
    assert_eq!(u.key(), Some(1));
    assert!(u.property_cache().is_none());
    assert!(u.column_value("lastName").is_some_and(|v| v.is_null()));
}
