//! Panel REST client
//!
//! Async client for the pgPanel backend. Every endpoint lives under `/api`
//! and, apart from login, expects `Authorization: Bearer <token>`.
//!
//! ```text
//! POST   /api/admin/login              {username, password} -> {token}
//! GET    /api/schema/tables[?reload]   -> {table: PgTable}
//! GET    /api/data/{table}?{RowQuery}  -> [Row]
//! POST   /api/data/{table}             Row -> [Row]
//! PUT    /api/data/{table}?filters=    Row -> [Row]
//! DELETE /api/data/{table}?filters=    -> [Row]
//! POST   /api/sql/execute              {query, args} -> {columns, rows, rowsAffected}
//! GET    /api/data/{main}/relations/{id}?relationTable=&joinTable=  -> [Row]
//! PUT    /api/data/{main}/relations/{id}?relationTable=&joinTable=  {addIds, deleteIds}
//! ```
//!
//! Non-2xx responses carry `{code, message}`; a 403 means the token is
//! missing or expired.

mod dto;
mod error;
mod token;

pub use dto::{
    ExportDatabaseOptions, LoginCreds, SqlExecuteRequest, SqlExecutionResponse, StorageFileInfo,
    SuccessLogin, UpdateRelatedRowsActions,
};
pub use error::{ApiError, ClientError, ClientResult};
pub use token::TokenStore;

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::ServerConfig;
use crate::pg_types::TablesMap;
use crate::pkeys::{multi_rows_filter_expr, PrimaryKeyMap};
use crate::row_query::{RowQuery, FILTERS_KEY};
use crate::table_settings::{RelationsConfig, TableSettings};
use crate::value::{CellValue, Row};

const API_PREFIX: &str = "api";

#[derive(Debug, Clone)]
pub struct PanelClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
    store: Option<TokenStore>,
}

impl PanelClient {
    /// Client for the backend at `base_url` with no timeout and no token.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_http(base_url, reqwest::Client::new())
    }

    pub fn from_config(config: &ServerConfig) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Self::with_http(&config.url, builder.build()?)
    }

    fn with_http(base_url: &str, http: reqwest::Client) -> ClientResult<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(PanelClient {
            http,
            base,
            token: None,
            store: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Persist tokens from `login` in `store`, picking up any token already saved.
    pub fn with_token_store(mut self, store: TokenStore) -> ClientResult<Self> {
        if self.token.is_none() {
            self.token = store.load()?;
        }
        self.store = Some(store);
        Ok(self)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `{base}/api/{segments...}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let request = builder.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.http.execute(request).await?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "panel request");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await?;
        let api_error = serde_json::from_slice::<ApiError>(&body).unwrap_or_else(|_| ApiError {
            code: status.as_u16(),
            message: fallback_message(status, &body),
        });
        warn!(%method, path, code = api_error.code, error = %api_error.message, "panel request failed");

        if status == StatusCode::FORBIDDEN || api_error.code == StatusCode::FORBIDDEN.as_u16() {
            return Err(ClientError::Unauthorized(api_error.message));
        }
        Err(ClientError::Api(api_error))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = self.send(builder).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_bytes(&self, builder: RequestBuilder) -> ClientResult<Vec<u8>> {
        let response = self.send(builder).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- admin ----

    /// Log in and keep the returned token (also saved to the token store, if any).
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<String> {
        let url = self.endpoint(&["admin", "login"])?;
        let creds = LoginCreds {
            username: username.to_string(),
            password: password.to_string(),
        };
        let login: SuccessLogin = self
            .send_json(self.http.post(url).json(&creds))
            .await?;

        if let Some(store) = &self.store {
            store.save(&login.token)?;
        }
        self.token = Some(login.token.clone());
        Ok(login.token)
    }

    pub fn logout(&mut self) -> ClientResult<()> {
        self.token = None;
        if let Some(store) = &self.store {
            store.clear()?;
        }
        Ok(())
    }

    // ---- schema ----

    /// Table metadata; `reload` makes the backend re-read the catalog first.
    pub async fn tables(&self, reload: bool) -> ClientResult<TablesMap> {
        let mut url = self.endpoint(&["schema", "tables"])?;
        if reload {
            url.query_pairs_mut().append_pair("reload", "true");
        }
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn table_settings(&self, table: &str) -> ClientResult<TableSettings> {
        let url = self.endpoint(&["schema", "settings", table])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn update_table_settings(
        &self,
        table: &str,
        settings: &TableSettings,
    ) -> ClientResult<TableSettings> {
        let url = self.endpoint(&["schema", "settings", table])?;
        self.send_json(self.request(Method::PUT, url).json(settings))
            .await
    }

    // ---- data ----

    pub async fn rows(&self, table: &str, query: &RowQuery) -> ClientResult<Vec<Row>> {
        let mut url = self.endpoint(&["data", table])?;
        query.to_search_params().apply_to(&mut url);
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn insert_row(&self, table: &str, row: &Row) -> ClientResult<Vec<Row>> {
        let url = self.endpoint(&["data", table])?;
        self.send_json(self.request(Method::POST, url).json(row))
            .await
    }

    /// Update every row matching `filters` with the fields of `row`.
    pub async fn update_rows(&self, table: &str, filters: &str, row: &Row) -> ClientResult<Vec<Row>> {
        let url = self.filtered_endpoint(table, filters)?;
        self.send_json(self.request(Method::PUT, url).json(row))
            .await
    }

    /// Delete every row matching `filters`.
    pub async fn delete_rows(&self, table: &str, filters: &str) -> ClientResult<Vec<Row>> {
        let url = self.filtered_endpoint(table, filters)?;
        self.send_json(self.request(Method::DELETE, url)).await
    }

    /// Delete the rows identified by their primary keys.
    pub async fn delete_rows_by_pkeys(
        &self,
        table: &str,
        pkeys: &[PrimaryKeyMap],
    ) -> ClientResult<Vec<Row>> {
        let filters = multi_rows_filter_expr(pkeys);
        self.delete_rows(table, &filters).await
    }

    /// Data endpoint with a mandatory filter. An empty filter would match the
    /// whole table, so it is refused.
    fn filtered_endpoint(&self, table: &str, filters: &str) -> ClientResult<Url> {
        if filters.trim().is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "refusing to modify every row of '{table}': empty filter"
            )));
        }
        let mut url = self.endpoint(&["data", table])?;
        url.query_pairs_mut().append_pair(FILTERS_KEY, filters);
        Ok(url)
    }

    // ---- relations ----

    /// Rows of `conf.relation_table` linked to `main_row_id` through the join table
    pub async fn related_rows(
        &self,
        conf: &RelationsConfig,
        main_row_id: &CellValue,
        query: &RowQuery,
    ) -> ClientResult<Vec<Row>> {
        let mut url = self.relations_endpoint(conf, main_row_id)?;
        url.query_pairs_mut()
            .extend_pairs(query.to_search_params().iter());
        self.send_json(self.request(Method::GET, url)).await
    }

    /// Link and unlink relation rows; bidirectional relations are mirrored by the backend.
    pub async fn update_related_rows(
        &self,
        conf: &RelationsConfig,
        main_row_id: &CellValue,
        actions: &UpdateRelatedRowsActions,
    ) -> ClientResult<()> {
        let url = self.relations_endpoint(conf, main_row_id)?;
        self.send(self.request(Method::PUT, url).json(actions))
            .await?;
        Ok(())
    }

    fn relations_endpoint(&self, conf: &RelationsConfig, main_row_id: &CellValue) -> ClientResult<Url> {
        if conf.relation_table.is_empty() || conf.join_table.is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "relation of '{}' needs both a relation table and a join table",
                conf.main_table
            )));
        }
        if main_row_id.is_null() || main_row_id.as_str() == Some("") {
            return Err(ClientError::InvalidRequest(format!(
                "missing row id for relations of '{}'",
                conf.main_table
            )));
        }

        let row_id = main_row_id.to_string();
        let mut url = self.endpoint(&["data", conf.main_table.as_str(), "relations", row_id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("relationTable", &conf.relation_table)
            .append_pair("joinTable", &conf.join_table)
            .append_pair("bidirectional", if conf.bidirectional { "true" } else { "false" });
        Ok(url)
    }

    // ---- sql ----

    pub async fn execute_sql(
        &self,
        query: &str,
        args: Option<&[serde_json::Value]>,
    ) -> ClientResult<SqlExecutionResponse> {
        let url = self.endpoint(&["sql", "execute"])?;
        let body = SqlExecuteRequest { query, args };
        self.send_json(self.request(Method::POST, url).json(&body))
            .await
    }

    // ---- files ----

    /// Files in `directory` (default `.`) whose names contain `filter`.
    pub async fn files(
        &self,
        directory: Option<&str>,
        filter: Option<&str>,
    ) -> ClientResult<Vec<StorageFileInfo>> {
        let mut url = self.endpoint(&["files", "list"])?;
        url.query_pairs_mut()
            .append_pair("directory", directory.filter(|d| !d.is_empty()).unwrap_or("."))
            .append_pair("filter", filter.unwrap_or_default());
        let list: Option<Vec<StorageFileInfo>> =
            self.send_json(self.request(Method::GET, url)).await?;
        Ok(list.unwrap_or_default())
    }

    pub async fn upload_file(&self, path: &Path) -> ClientResult<StorageFileInfo> {
        let url = self.endpoint(&["files", "upload"])?;
        let form = Form::new().part("file", file_part(path).await?);
        self.send_json(self.request(Method::POST, url).multipart(form))
            .await
    }

    pub async fn delete_file(&self, name: &str) -> ClientResult<()> {
        let url = self.endpoint(&["files", name])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    // ---- backup ----

    /// SQL dump of the database
    pub async fn export_database(&self, options: &ExportDatabaseOptions) -> ClientResult<Vec<u8>> {
        let url = self.endpoint(&["backup", "export-db"])?;
        self.send_bytes(self.request(Method::POST, url).json(options))
            .await
    }

    /// Restore a dump produced by [`PanelClient::export_database`]
    pub async fn import_database(&self, path: &Path) -> ClientResult<()> {
        let url = self.endpoint(&["backup", "import-db"])?;
        let form = Form::new().part("file", file_part(path).await?);
        self.send(self.request(Method::POST, url).multipart(form))
            .await?;
        Ok(())
    }

    /// Archive of the file storage
    pub async fn export_storage(&self) -> ClientResult<Vec<u8>> {
        let url = self.endpoint(&["backup", "export-storage"])?;
        self.send_bytes(self.request(Method::POST, url)).await
    }
}

async fn file_part(path: &Path) -> ClientResult<Part> {
    let data = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(Part::bytes(data).file_name(name))
}

fn fallback_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        let client = PanelClient::new("http://localhost:8080").unwrap();
        let url = client.endpoint(&["data", "users"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/data/users");

        let prefixed = PanelClient::new("http://example.com/panel/").unwrap();
        let url = prefixed.endpoint(&["files", "my file.txt"]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/panel/api/files/my%20file.txt");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            PanelClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            PanelClient::new("mailto:admin@example.com"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_empty_filter_refused() {
        let client = PanelClient::new("http://localhost:8080").unwrap();
        assert!(matches!(
            client.filtered_endpoint("users", "  "),
            Err(ClientError::InvalidRequest(_))
        ));
        let url = client.filtered_endpoint("users", "id=1 OR id=2").unwrap();
        assert_eq!(url.query(), Some("filters=id%3D1+OR+id%3D2"));
    }

    #[test]
    fn test_relations_endpoint() {
        let client = PanelClient::new("http://localhost:8080").unwrap();
        let conf = RelationsConfig {
            main_table: "users".into(),
            relation_table: "groups".into(),
            join_table: "memberships".into(),
            bidirectional: false,
        };
        let url = client.relations_endpoint(&conf, &CellValue::from(3_i64)).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/data/users/relations/3?relationTable=groups&joinTable=memberships&bidirectional=false"
        );
        assert!(matches!(
            client.relations_endpoint(&conf, &CellValue::Null),
            Err(ClientError::InvalidRequest(_))
        ));
        let no_join = RelationsConfig {
            join_table: String::new(),
            ..conf
        };
        assert!(client.relations_endpoint(&no_join, &CellValue::from(3_i64)).is_err());
    }

    #[test]
    fn test_fallback_message() {
        assert_eq!(fallback_message(StatusCode::BAD_GATEWAY, b""), "Bad Gateway");
        assert_eq!(fallback_message(StatusCode::BAD_GATEWAY, b" upstream down\n"), "upstream down");
    }
}
