use proptest::prelude::*;
use rowmap_core::{Direction, Limit, SortKey, Statement, Value};
use rowmap_sql_builder::{render, Placeholder};

fn column() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,8}"
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::I64),
        any::<bool>().prop_map(Value::Bool),
        "[a-z ]{0,6}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

fn placeholder() -> impl Strategy<Value = Placeholder> {
    prop_oneof![Just(Placeholder::Question), Just(Placeholder::Dollar)]
}

fn assert_placeholders(sql: &str, params: usize, ph: Placeholder) -> Result<(), TestCaseError> {
    match ph {
        Placeholder::Question => {
            prop_assert_eq!(sql.matches('?').count(), params);
        }
        Placeholder::Dollar => {
            prop_assert_eq!(sql.matches('$').count(), params);
            for i in 1..=params {
                let needle = format!("${}", i);
                prop_assert!(sql.contains(&needle), "missing {} in {}", needle, sql);
            }
        }
    }
    Ok(())
}

proptest! {
    // Property: select placeholders equal the number of bound filter values.
    #[test]
    fn select_placeholder_count(
        filters in prop::collection::vec((column(), value()), 0..6),
        sort in prop::collection::vec((column(), any::<bool>()), 0..3),
        take in proptest::option::of(0u64..100),
        ph in placeholder(),
    ) {
        let st = Statement::Select {
            table: "product",
            filters: filters.iter().map(|(c, v)| (c.as_str(), v.clone())).collect(),
            order: sort
                .iter()
                .map(|(c, desc)| SortKey {
                    column: c.as_str(),
                    direction: if *desc { Direction::Desc } else { Direction::Asc },
                })
                .collect(),
            limit: take.map(Limit::First),
        };
        let (sql, params) = render(&st, ph);
        prop_assert_eq!(params.len(), filters.len());
        assert_placeholders(&sql, params.len(), ph)?;
        prop_assert_eq!(sql.contains(" ORDER BY "), !sort.is_empty());
    }

    // Property: update binds every assignment plus the key, numbered contiguously.
    #[test]
    fn update_placeholder_count(
        assignments in prop::collection::vec((column(), value()), 1..8),
        key in any::<i64>(),
        ph in placeholder(),
    ) {
        let st = Statement::Update {
            table: "product",
            assignments: assignments.iter().map(|(c, v)| (c.as_str(), v.clone())).collect(),
            key_column: "idProduct",
            key: Value::I64(key),
        };
        let (sql, params) = render(&st, ph);
        prop_assert_eq!(params.len(), assignments.len() + 1);
        prop_assert_eq!(params.last(), Some(&Value::I64(key)));
        assert_placeholders(&sql, params.len(), ph)?;
    }

    // Property: insert renders one placeholder per column.
    #[test]
    fn insert_placeholder_count(
        columns in prop::collection::vec(column(), 1..8),
        ph in placeholder(),
    ) {
        let cols: Vec<&str> = columns.iter().map(String::as_str).collect();
        let st = Statement::Insert {
            table: "product",
            columns: cols.clone(),
            values: vec![Value::Null; cols.len()],
        };
        let (sql, params) = render(&st, ph);
        prop_assert_eq!(params.len(), cols.len());
        assert_placeholders(&sql, params.len(), ph)?;
    }
}
