//! # pgpanel
//!
//! Client toolkit for the pgPanel PostgreSQL admin backend: decides how each
//! column is edited, encodes table views as URL query strings, builds
//! primary-key filters for row mutations, and talks to the REST API.
//!
//! ## Data Flow
//!
//! ```text
//! GET /api/schema/tables ──▶ TablesMap ──▶ PgTable ──┬──▶ resolve_input_type ──▶ build_form
//!                                                    │
//! URL query ──▶ RowQuery::parse ──▶ active_filters ──┘
//!                   │
//!                   └── to_search_params ──▶ GET /api/data/{table}
//!                                                   │
//!                                     [Row] ──▶ DataRow ──▶ pkeys ──▶ multi_rows_filter_expr
//!                                                                      │
//!                                                    DELETE /api/data/{table}?filters=
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pgpanel::{PanelClient, RowQuery, DataRow};
//!
//! let mut client = PanelClient::new("http://localhost:8080")?;
//! client.login("admin", "secret").await?;
//!
//! let tables = client.tables(false).await?;
//! let users = &tables["users"];
//!
//! let query = RowQuery::from_query_str("sort=-created_at&limit=20");
//! for row in DataRow::from_rows(users, client.rows("users", &query).await?) {
//!     println!("{} -> {}", row.unique_key(), row.text_label());
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `pg_types` | Column/table metadata and type OIDs |
//! | `inputs` | Column → input control resolution |
//! | `row_query` | Table view ⇄ URL query string codec |
//! | `filters` | Text search and SQL filter rendering |
//! | `pkeys` | Primary-key filter expressions |
//! | `value` | Cell values and rows |
//! | `data_row` | Rows bound to their table |
//! | `table_settings` | Per-table settings, view and relation links |
//! | `form` | Row form fields and input encoding |
//! | `client` | REST client for the panel backend |
//! | `config` | Layered configuration |
//! | `logging` | Tracing subscriber setup |

pub mod pg_types;
pub mod inputs;
pub mod row_query;
pub mod filters;
pub mod pkeys;

pub mod value;
pub mod data_row;
pub mod table_settings;
pub mod form;

pub mod client;

pub mod config;
pub mod logging;

// Re-export public types
pub use client::{ApiError, ClientError, ClientResult, PanelClient, TokenStore};
pub use config::Config;
pub use data_row::DataRow;
pub use filters::{search_by_text_columns, Filters, SqlFilter};
pub use form::{build_form, FormField, InputValue};
pub use inputs::{resolve_input_type, InputKind, InputTypeLookup, OverrideMap};
pub use pg_types::{Oid, PgColumn, PgTable, TablesMap};
pub use pkeys::{multi_rows_filter_expr, pkeys_map_to_filter_expr, PrimaryKeyMap};
pub use row_query::{RowQuery, SearchParams, SortField, SortOrder};
pub use table_settings::{RelationsConfig, SettingsError, TableSettings};
pub use value::{CellValue, Row};
