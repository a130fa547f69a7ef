//! Per-table settings
//!
//! Persisted by the backend per table and edited from the settings page:
//! which columns the table view shows, which columns text search covers,
//! input overrides for the row form, a link pattern for opening a row in an
//! external site, and many-to-many relation definitions.

use std::sync::OnceLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::form_urlencoded;

use crate::inputs::OverrideMap;
use crate::pg_types::PgTable;
use crate::row_query::RowQuery;
use crate::value::Row;

/// Errors building relation links from settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Join table has no foreign key into the main table
    #[error("Join table '{join_table}' has no foreign key to '{main_table}'")]
    MissingForeignKey {
        join_table: String,
        main_table: String,
    },

    /// Row has no value for the key column the relation joins on
    #[error("Row has no value for '{column}'")]
    MissingRowId { column: String },
}

/// Many-to-many relation of a table through a join table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationsConfig {
    pub main_table: String,
    pub relation_table: String,
    pub join_table: String,
    #[serde(default)]
    pub bidirectional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSettings {
    /// e.g. `https://admin.example.com/users/{id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_link_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_view_select_columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_view_text_filters_cols: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_inputs: Option<OverrideMap>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<RelationsConfig>,
}

impl TableSettings {
    pub fn overrides(&self) -> Option<&OverrideMap> {
        self.overridden_inputs.as_ref()
    }

    pub fn hidden_columns(&self) -> Vec<String> {
        hidden_columns(self.overrides())
    }

    /// Fill in the view's stored column choices where `query` leaves them unset.
    pub fn apply_view_defaults(&self, query: &RowQuery) -> RowQuery {
        let mut query = query.clone();
        if query.select_cols.is_none() && !self.table_view_select_columns.is_empty() {
            query.select_cols = Some(self.table_view_select_columns.clone());
        }
        if query.text_filters.is_some()
            && query.text_filters_cols.is_none()
            && !self.table_view_text_filters_cols.is_empty()
        {
            query.text_filters_cols = Some(self.table_view_text_filters_cols.clone());
        }
        query
    }
}

/// Column names overridden to the `hidden` input kind, sorted
pub fn hidden_columns(overrides: Option<&OverrideMap>) -> Vec<String> {
    let mut names: Vec<String> = overrides
        .into_iter()
        .flatten()
        .filter(|(_, lookup)| lookup.is_hidden())
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"))
}

/// Substitute `{column}` placeholders in `pattern` with the row's values.
///
/// Values are percent-encoded. Placeholders naming a column that is missing
/// or falsy (null, false, 0, "") are left as-is.
pub fn generate_view_link(pattern: &str, row: &Row) -> String {
    placeholder_regex()
        .replace_all(pattern, |caps: &Captures<'_>| {
            let column = &caps[1];
            match row.get(column).filter(|v| v.is_truthy()) {
                Some(value) => utf8_percent_encode(&value.to_string(), COMPONENT).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Link to the relations editor for `row` of `conf.main_table`.
pub fn generate_edit_relations_link(
    row: &Row,
    conf: &RelationsConfig,
    join_table: &PgTable,
) -> Result<String, SettingsError> {
    let fk_column = join_table
        .foreign_key_column_for(&conf.main_table)
        .and_then(|col| col.foreign_key.as_ref())
        .ok_or_else(|| SettingsError::MissingForeignKey {
            join_table: join_table.name.clone(),
            main_table: conf.main_table.clone(),
        })?;

    let main_table_id_key = fk_column.column_name.as_str();
    let main_table_row_id = row
        .get(main_table_id_key)
        .filter(|v| v.is_truthy())
        .ok_or_else(|| SettingsError::MissingRowId {
            column: main_table_id_key.to_string(),
        })?;

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("relationTable", &conf.relation_table)
        .append_pair("joinTable", &conf.join_table)
        .append_pair("bidirectional", if conf.bidirectional { "true" } else { "false" })
        .append_pair("mainTableIdKey", main_table_id_key)
        .append_pair("mainTableRowId", &main_table_row_id.to_string())
        .finish();

    Ok(format!("/{}/relations?{query}", conf.main_table))
}

/// Characters `encodeURIComponent` escapes: everything but alphanumerics and `-_.!~*'()`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');
