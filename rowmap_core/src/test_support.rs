//! Hand-written entities and a scripted adapter for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde::Serialize;

use crate::entity::{read_column, Entity, PropertyCache};
use crate::error::{RepoResult, StorageResult};
use crate::statement::Statement;
use crate::storage::{Outcome, Row, StorageAdapter};
use crate::value::Value;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Shelf {
    pub id_shelf: Option<i64>,
    pub label: String,
}

impl Entity for Shelf {
    const TYPE_NAME: &'static str = "Shelf";
    const COLUMNS: &'static [&'static str] = &["idShelf", "label"];

    fn key(&self) -> Option<i64> {
        self.id_shelf
    }
    fn set_key(&mut self, key: Option<i64>) {
        self.id_shelf = key;
    }
    fn column_value(&self, column: &str) -> Option<Value> {
        match column {
            "idShelf" => Some(self.id_shelf.into()),
            "label" => Some(self.label.clone().into()),
            _ => None,
        }
    }
    fn assign_row(&mut self, row: &Row) -> RepoResult<()> {
        let id_shelf = read_column::<Option<i64>>(row, "Shelf", "idShelf")?;
        let label = read_column::<String>(row, "Shelf", "label")?;
        if let Some(v) = id_shelf {
            self.id_shelf = v;
        }
        if let Some(v) = label {
            self.label = v;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Widget {
    pub id_widget: Option<i64>,
    pub id_shelf: Option<i64>,
    pub name: String,
    pub price: f64,
    #[serde(skip)]
    pub cache: PropertyCache,
}

impl Entity for Widget {
    const TYPE_NAME: &'static str = "Widget";
    const COLUMNS: &'static [&'static str] = &["idWidget", "idShelf", "name", "price"];

    fn key(&self) -> Option<i64> {
        self.id_widget
    }
    fn set_key(&mut self, key: Option<i64>) {
        self.id_widget = key;
    }
    fn column_value(&self, column: &str) -> Option<Value> {
        match column {
            "idWidget" => Some(self.id_widget.into()),
            "idShelf" => Some(self.id_shelf.into()),
            "name" => Some(self.name.clone().into()),
            "price" => Some(self.price.into()),
            _ => None,
        }
    }
    fn assign_row(&mut self, row: &Row) -> RepoResult<()> {
        let id_widget = read_column::<Option<i64>>(row, "Widget", "idWidget")?;
        let id_shelf = read_column::<Option<i64>>(row, "Widget", "idShelf")?;
        let name = read_column::<String>(row, "Widget", "name")?;
        let price = read_column::<f64>(row, "Widget", "price")?;
        if let Some(v) = id_widget {
            self.id_widget = v;
        }
        if let Some(v) = id_shelf {
            self.id_shelf = v;
        }
        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = price {
            self.price = v;
        }
        Ok(())
    }
    fn property_cache(&self) -> Option<&PropertyCache> {
        Some(&self.cache)
    }
}

/// Records every statement (as its `Debug` text) and answers from a script.
#[derive(Default)]
pub struct Scripted {
    pub log: RefCell<Vec<String>>,
    replies: RefCell<VecDeque<StorageResult<Outcome>>>,
}

impl Scripted {
    pub fn reply(&self, reply: StorageResult<Outcome>) -> &Self {
        self.replies.borrow_mut().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn last(&self) -> String {
        self.log.borrow().last().cloned().unwrap_or_default()
    }
}

impl StorageAdapter for Scripted {
    fn execute(&self, statement: &Statement<'_>) -> StorageResult<Outcome> {
        self.log.borrow_mut().push(format!("{:?}", statement));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(Outcome::default()))
    }
}

pub fn widget_row(id: i64, shelf: Option<i64>, name: &str, price: f64) -> Row {
    [
        ("idWidget", Value::I64(id)),
        ("idShelf", Value::from(shelf)),
        ("name", Value::from(name)),
        ("price", Value::F64(price)),
    ]
    .into_iter()
    .collect()
}
