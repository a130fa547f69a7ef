//! Rows bound to their table
//!
//! A [`DataRow`] pairs a fetched row with the [`PgTable`] it came from, so
//! key-based helpers (filters, links, labels) can consult the schema. Rows
//! from raw SQL have no table and cannot be wrapped.

use url::form_urlencoded;

use crate::pg_types::{oid, PgTable};
use crate::pkeys::{pkeys_map_to_filter_expr, row_key, PrimaryKeyMap};
use crate::row_query::FILTERS_KEY;
use crate::table_settings::generate_view_link;
use crate::value::{CellValue, Row};

/// Maximum length of [`DataRow::text_label`] in characters
pub const TEXT_LABEL_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct DataRow<'a> {
    table: &'a PgTable,
    data: Row,
}

impl<'a> DataRow<'a> {
    pub fn new(table: &'a PgTable, data: Row) -> Self {
        DataRow { table, data }
    }

    pub fn from_rows(table: &'a PgTable, rows: Vec<Row>) -> Vec<Self> {
        rows.into_iter().map(|row| DataRow::new(table, row)).collect()
    }

    pub fn table(&self) -> &PgTable {
        self.table
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.data.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.data.insert(column.into(), value.into());
    }

    /// Display form of a field; a missing column renders like `NULL`
    pub fn get_as_string(&self, column: &str) -> String {
        self.get(column)
            .map_or_else(|| CellValue::Null.to_string(), ToString::to_string)
    }

    /// Primary key values in declaration order.
    ///
    /// Null and empty-string values are skipped, so a row missing part of a
    /// compound key yields a partial map.
    pub fn pkeys(&self) -> PrimaryKeyMap {
        self.table
            .primary_keys()
            .filter_map(|col| {
                let value = self.data.get(&col.name)?;
                match value {
                    CellValue::Null => None,
                    CellValue::String(s) if s.is_empty() => None,
                    other => Some((col.name.clone(), other.to_string())),
                }
            })
            .collect()
    }

    /// Value of the first primary key column, usable as the row id
    pub fn pkey(&self) -> Option<&CellValue> {
        let first = self.table.primary_keys().next()?;
        self.data.get(&first.name)
    }

    /// Filter expression selecting this row
    pub fn pkeys_filters(&self) -> String {
        pkeys_map_to_filter_expr(&self.pkeys())
    }

    pub fn update_link(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(FILTERS_KEY, &self.pkeys_filters())
            .finish();
        format!("/{}/row/update?{query}", self.table.name)
    }

    pub fn unique_key(&self) -> String {
        row_key(&self.table.name, &self.pkeys())
    }

    pub fn is_eq(&self, other: &DataRow<'_>) -> bool {
        self.unique_key() == other.unique_key()
    }

    /// Short human label: the first `text`/`varchar` column's value, or the
    /// joined key values when that is empty.
    pub fn text_label(&self) -> String {
        let label_column = self
            .table
            .columns
            .iter()
            .find(|col| col.oid == oid::TEXT || col.oid == oid::VARCHAR);

        if let Some(value) = label_column
            .and_then(|col| self.data.get(&col.name))
            .filter(|v| v.is_truthy())
        {
            return value.to_string().chars().take(TEXT_LABEL_MAX_CHARS).collect();
        }

        self.pkeys()
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn view_link(&self, pattern: Option<&str>) -> Option<String> {
        pattern
            .filter(|p| !p.is_empty())
            .map(|p| generate_view_link(p, &self.data))
    }

    pub fn to_row(&self) -> Row {
        self.data.clone()
    }

    pub fn into_row(self) -> Row {
        self.data
    }
}
