//! Structured statements handed from the mapper to a storage adapter.
//!
//! The mapper never produces SQL text itself. Adapters either interpret a
//! [`Statement`] directly or render it (see `rowmap_sql_builder`).

use std::fmt;
use std::str::FromStr;

use crate::value::Value;

/// Sort direction of a single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sort direction `{0}`, expected ASC or DESC")]
pub struct DirectionError(pub String);

impl FromStr for Direction {
    type Err = DirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if t.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(DirectionError(s.to_string()))
        }
    }
}

/// A column and the direction to order it by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<'a> {
    pub column: &'a str,
    pub direction: Direction,
}

/// Positional row limit of a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// At most `n` rows from the start (`LIMIT n`).
    First(u64),
    /// Skip `skip` rows, then return at most `take` (`LIMIT skip,take`).
    Window { skip: u64, take: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid limit `{0}`, expected `N` or `N,M`")]
pub struct LimitError(pub String);

impl Limit {
    /// Parse a limit token, treating an empty token as "no limit".
    pub fn from_token(token: &str) -> Result<Option<Limit>, LimitError> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        token.parse().map(Some)
    }

    /// Rows to skip before the first returned row.
    pub fn skip(&self) -> u64 {
        match self {
            Limit::First(_) => 0,
            Limit::Window { skip, .. } => *skip,
        }
    }

    /// Maximum number of rows returned.
    pub fn take(&self) -> u64 {
        match self {
            Limit::First(n) => *n,
            Limit::Window { take, .. } => *take,
        }
    }
}

impl FromStr for Limit {
    type Err = LimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LimitError(s.to_string());
        let number = |part: &str| part.trim().parse::<u64>().map_err(|_| err());
        match s.split_once(',') {
            None => number(s).map(Limit::First),
            Some((skip, take)) => Ok(Limit::Window {
                skip: number(skip)?,
                take: number(take)?,
            }),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::First(n) => write!(f, "{}", n),
            Limit::Window { skip, take } => write!(f, "{},{}", skip, take),
        }
    }
}

/// One storage operation.
///
/// Column names in `filters` and `order` come straight from the caller and are
/// not validated.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    /// Every column of `table`, filtered by an AND of equalities.
    Select {
        table: &'a str,
        filters: Vec<(&'a str, Value)>,
        order: Vec<SortKey<'a>>,
        limit: Option<Limit>,
    },
    Insert {
        table: &'a str,
        columns: Vec<&'a str>,
        values: Vec<Value>,
    },
    Update {
        table: &'a str,
        assignments: Vec<(&'a str, Value)>,
        key_column: &'a str,
        key: Value,
    },
    Delete {
        table: &'a str,
        key_column: &'a str,
        key: Value,
    },
}

impl<'a> Statement<'a> {
    pub fn table(&self) -> &'a str {
        match self {
            Statement::Select { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => table,
        }
    }

    /// Short operation name used in logs.
    pub fn op(&self) -> &'static str {
        match self {
            Statement::Select { .. } => "select",
            Statement::Insert { .. } => "insert",
            Statement::Update { .. } => "update",
            Statement::Delete { .. } => "delete",
        }
    }
}
