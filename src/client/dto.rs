//! Request and response bodies of the panel REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pg_types::PgTable;
use crate::value::{CellValue, Row};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCreds {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessLogin {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlExecuteRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<&'a [serde_json::Value]>,
}

/// Result of a raw SQL statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlExecutionResponse {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub rows_affected: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageFileInfo {
    pub name: String,
    /// Unix seconds
    pub mod_time: i64,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub is_image: bool,
    #[serde(default)]
    pub internal_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl StorageFileInfo {
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.mod_time, 0)
    }
}

/// Options for `pg_dump` based database export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDatabaseOptions {
    /// Restrict the dump to these tables; empty means all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<PgTable>,
    #[serde(default)]
    pub data_only: bool,
    #[serde(default)]
    pub clean: bool,
}

/// Changes to the join-table links of one main-table row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRelatedRowsActions {
    /// Relation-table ids to link
    #[serde(default)]
    pub add_ids: Vec<CellValue>,
    /// Relation-table ids to unlink
    #[serde(default)]
    pub delete_ids: Vec<CellValue>,
}

impl UpdateRelatedRowsActions {
    /// Actions that turn the `current` set of related ids into `selected`
    pub fn diff(current: &[CellValue], selected: &[CellValue]) -> Self {
        UpdateRelatedRowsActions {
            add_ids: selected
                .iter()
                .filter(|id| !current.contains(id))
                .cloned()
                .collect(),
            delete_ids: current
                .iter()
                .filter(|id| !selected.contains(id))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add_ids.is_empty() && self.delete_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_info_wire_names() {
        let json = r#"{
            "name": "logo.png",
            "modTime": 1700000000,
            "isDir": false,
            "isImage": true,
            "internalUrl": "/storage/logo.png"
        }"#;
        let info: StorageFileInfo = serde_json::from_str(json).unwrap();
        assert!(info.is_image);
        assert_eq!(info.upload_key, None);
        assert_eq!(
            info.modified_at().map(|t| t.to_rfc3339()),
            Some("2023-11-14T22:13:20+00:00".to_string())
        );
    }

    #[test]
    fn test_sql_response_defaults() {
        let resp: SqlExecutionResponse = serde_json::from_str(r#"{"rowsAffected": 3}"#).unwrap();
        assert_eq!(resp.rows_affected, 3);
        assert!(resp.rows.is_empty());
    }

    #[test]
    fn test_export_options_camel_case() {
        let opts = ExportDatabaseOptions {
            data_only: true,
            ..ExportDatabaseOptions::default()
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json, serde_json::json!({"dataOnly": true, "clean": false}));
    }

    #[test]
    fn test_related_rows_diff() {
        let current = [CellValue::from(1_i64), CellValue::from(2_i64)];
        let selected = [CellValue::from(2_i64), CellValue::from(3_i64)];
        let actions = UpdateRelatedRowsActions::diff(&current, &selected);
        assert_eq!(
            serde_json::to_value(&actions).unwrap(),
            serde_json::json!({"addIds": [3], "deleteIds": [1]})
        );
        assert!(UpdateRelatedRowsActions::diff(&current, &current).is_empty());
    }
}
