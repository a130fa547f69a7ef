//! Row filters
//!
//! A table view filters rows either by free text (matched with `ILIKE`
//! against text columns) or by a raw SQL expression with positional
//! arguments. Text search values are always passed as `$1`, never
//! interpolated into the statement.

use serde::{Deserialize, Serialize};

use crate::pg_types::{PgColumn, PgTable};

/// Active filter of a table view
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filters {
    /// Case-insensitive substring search. Empty `cols` means all text columns.
    TextSearch { text: String, cols: Vec<String> },
    /// Raw `WHERE` expression
    Sql { statement: String, args: Vec<String> },
    #[default]
    None,
}

/// SQL statement fragment plus its positional arguments
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SqlFilter {
    pub statement: String,
    pub args: Vec<String>,
}

impl Filters {
    pub fn is_none(&self) -> bool {
        matches!(self, Filters::None)
    }

    /// Render as a `WHERE` fragment for `table`.
    ///
    /// Text search with no matching columns yields `FALSE`, so nothing
    /// matches instead of everything.
    pub fn to_sql(&self, table: &PgTable) -> SqlFilter {
        match self {
            Filters::None => SqlFilter::default(),
            Filters::Sql { statement, args } => SqlFilter {
                statement: statement.clone(),
                args: args.clone(),
            },
            Filters::TextSearch { text, cols } => {
                let columns: Vec<&PgColumn> = if cols.is_empty() {
                    table.text_columns().collect()
                } else {
                    table.columns_by_names(cols)
                };
                if columns.is_empty() {
                    return SqlFilter {
                        statement: "FALSE".to_string(),
                        args: Vec::new(),
                    };
                }
                ilike_filter(&columns, text, true)
            }
        }
    }
}

/// Search `q` across the table's text columns.
///
/// Produces `"col" ILIKE $1 OR ...` with the single argument `%q%`
/// (lowercased). A table without text columns yields an empty statement and
/// no arguments.
pub fn search_by_text_columns(q: &str, table: &PgTable) -> SqlFilter {
    let columns: Vec<&PgColumn> = table.text_columns().collect();
    if columns.is_empty() {
        return SqlFilter::default();
    }
    ilike_filter(&columns, q, false)
}

fn ilike_filter(columns: &[&PgColumn], text: &str, cast_to_text: bool) -> SqlFilter {
    let statement = columns
        .iter()
        .map(|col| {
            if cast_to_text {
                format!("{}::text ILIKE $1", col.safe_name())
            } else {
                format!("{} ILIKE $1", col.safe_name())
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ");

    SqlFilter {
        statement,
        args: vec![format!("%{}%", text.to_lowercase())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pg_types::oid;

    fn posts() -> PgTable {
        PgTable::new(
            "posts",
            vec![
                PgColumn::new("id", oid::INT8).primary_key(),
                PgColumn::new("title", oid::VARCHAR),
                PgColumn::new("body", oid::TEXT),
                PgColumn::new("views", oid::INT4),
            ],
        )
    }

    #[test]
    fn test_search_by_text_columns() {
        let filter = search_by_text_columns("Rust", &posts());
        assert_eq!(filter.statement, "\"title\" ILIKE $1 OR \"body\" ILIKE $1");
        assert_eq!(filter.args, vec!["%rust%"]);
    }

    #[test]
    fn test_search_without_text_columns() {
        let table = PgTable::new("counters", vec![PgColumn::new("n", oid::INT4)]);
        assert_eq!(search_by_text_columns("x", &table), SqlFilter::default());
    }

    #[test]
    fn test_text_search_restricted_columns() {
        let filters = Filters::TextSearch {
            text: "Hello".into(),
            cols: vec!["body".into(), "nope".into()],
        };
        let sql = filters.to_sql(&posts());
        assert_eq!(sql.statement, "\"body\"::text ILIKE $1");
        assert_eq!(sql.args, vec!["%hello%"]);
    }

    #[test]
    fn test_text_search_no_columns_matches_nothing() {
        let filters = Filters::TextSearch {
            text: "x".into(),
            cols: vec!["missing".into()],
        };
        assert_eq!(filters.to_sql(&posts()).statement, "FALSE");
    }

    #[test]
    fn test_sql_filters_pass_through() {
        let filters = Filters::Sql {
            statement: "views > $1".into(),
            args: vec!["10".into()],
        };
        let sql = filters.to_sql(&posts());
        assert_eq!(sql.statement, "views > $1");
        assert_eq!(sql.args, vec!["10"]);
        assert_eq!(Filters::None.to_sql(&posts()), SqlFilter::default());
    }
}
