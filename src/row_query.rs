//! Row Query Codec
//!
//! A table view is fully described by its URL query string:
//!
//! ```text
//! ?offset=50&limit=25&sort=name|-age&textFilters=bob&textFiltersCols=name|email&selectCols=id|name
//! ```
//!
//! [`RowQuery::parse`] decodes it, [`RowQuery::to_search_params`] encodes it
//! back. List-valued parameters use `|` as the delimiter. Decoding never
//! fails: malformed or missing values fall back to defaults.
//!
//! Encoding omits every falsy field (zero offset, zero limit, empty strings,
//! empty lists), so an explicit `offset=0` cannot be told apart from an unset
//! offset after a round trip. Both decode to `0`.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

use crate::filters::Filters;

pub const OFFSET_KEY: &str = "offset";
pub const LIMIT_KEY: &str = "limit";
pub const SORT_KEY: &str = "sort";
pub const TEXT_FILTERS_KEY: &str = "textFilters";
pub const TEXT_FILTERS_COLS_KEY: &str = "textFiltersCols";
pub const FILTERS_KEY: &str = "filters";
pub const FILTERS_ARGS_KEY: &str = "filtersArgs";
pub const SELECT_COLS_KEY: &str = "selectCols";

/// Delimiter for list-valued query parameters
pub const LIST_DELIMITER: char = '|';

pub const DEFAULT_LIMIT: u64 = 50;

/// Largest page size the pagination helpers allow
pub const MAX_LIMIT: u64 = 500;

/// Sort direction of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One parsed `sort` entry (`name` or `-name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortField {
    pub name: String,
    pub order: SortOrder,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        let field = match raw.strip_prefix('-') {
            Some(name) => SortField {
                name: name.to_string(),
                order: SortOrder::Desc,
            },
            None => SortField {
                name: raw.to_string(),
                order: SortOrder::Asc,
            },
        };
        Some(field)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            SortOrder::Asc => write!(f, "{}", self.name),
            SortOrder::Desc => write!(f, "-{}", self.name),
        }
    }
}

/// Decoded pagination/sort/filter parameters of a table view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowQuery {
    pub offset: u64,
    pub limit: u64,
    /// Column names, `-` prefixed for descending. First entry is the primary key of the sort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    /// Free-text search across text columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_filters: Option<String>,
    /// Restricts the free-text search to these columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_filters_cols: Option<Vec<String>>,
    /// Raw SQL `WHERE` expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    /// Positional arguments (`$1`, `$2`, ...) for `filters`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_cols: Option<Vec<String>>,
}

impl Default for RowQuery {
    fn default() -> Self {
        RowQuery {
            offset: 0,
            limit: DEFAULT_LIMIT,
            sort: None,
            text_filters: None,
            text_filters_cols: None,
            filters: None,
            filters_args: None,
            select_cols: None,
        }
    }
}

impl RowQuery {
    /// Decode the query component of `url`.
    pub fn parse(url: &Url) -> Self {
        Self::from_pairs(
            url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())),
            DEFAULT_LIMIT,
        )
    }

    /// Decode a bare query string (with or without the leading `?`).
    pub fn from_query_str(query: &str) -> Self {
        Self::from_query_str_with_limit(query, DEFAULT_LIMIT)
    }

    /// Like [`RowQuery::from_query_str`], with `default_limit` standing in
    /// for a missing or invalid `limit`.
    pub fn from_query_str_with_limit(query: &str, default_limit: u64) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(
            form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
            default_limit,
        )
    }

    fn from_pairs(pairs: impl Iterator<Item = (String, String)>, default_limit: u64) -> Self {
        let mut raw = RawParams::default();
        for (key, value) in pairs {
            raw.set_first(&key, value);
        }

        RowQuery {
            offset: parse_offset(raw.offset.as_deref()),
            limit: parse_limit(raw.limit.as_deref(), default_limit),
            sort: raw.sort.as_deref().and_then(split_list),
            text_filters: raw.text_filters.filter(|s| !s.is_empty()),
            text_filters_cols: raw.text_filters_cols.as_deref().and_then(split_list),
            filters: raw.filters.filter(|s| !s.is_empty()),
            filters_args: raw.filters_args.as_deref().and_then(split_list),
            select_cols: raw.select_cols.as_deref().and_then(split_list),
        }
    }

    /// Encode into query parameters. Falsy fields are omitted.
    pub fn to_search_params(&self) -> SearchParams {
        let mut params = SearchParams::default();

        if self.offset > 0 {
            params.push(OFFSET_KEY, self.offset.to_string());
        }
        if self.limit > 0 {
            params.push(LIMIT_KEY, self.limit.to_string());
        }
        params.push_list(SORT_KEY, self.sort.as_deref());
        params.push_str(TEXT_FILTERS_KEY, self.text_filters.as_deref());
        params.push_list(TEXT_FILTERS_COLS_KEY, self.text_filters_cols.as_deref());
        params.push_str(FILTERS_KEY, self.filters.as_deref());
        params.push_list(FILTERS_ARGS_KEY, self.filters_args.as_deref());
        params.push_list(SELECT_COLS_KEY, self.select_cols.as_deref());

        params
    }

    /// Parsed sort entries, empty entries skipped
    pub fn sort_fields(&self) -> Vec<SortField> {
        self.sort
            .iter()
            .flatten()
            .filter_map(|raw| SortField::parse(raw))
            .collect()
    }

    /// Active filter; text search wins over a raw SQL expression.
    pub fn active_filters(&self) -> Filters {
        if let Some(text) = &self.text_filters {
            return Filters::TextSearch {
                text: text.clone(),
                cols: self.text_filters_cols.clone().unwrap_or_default(),
            };
        }
        match &self.filters {
            Some(statement) => Filters::Sql {
                statement: statement.clone(),
                args: self.filters_args.clone().unwrap_or_default(),
            },
            None => Filters::None,
        }
    }

    /// Apply a search box submission.
    ///
    /// Resets to the first page and sets exactly one of `filters` (SQL mode)
    /// or `text_filters`; an empty query clears both.
    pub fn with_search(&self, q: &str, sql_mode: bool) -> Self {
        let q = (!q.is_empty()).then(|| q.to_string());
        RowQuery {
            offset: 0,
            filters: if sql_mode { q.clone() } else { None },
            text_filters: if sql_mode { None } else { q },
            filters_args: if sql_mode { self.filters_args.clone() } else { None },
            ..self.clone()
        }
    }

    /// Flip the sort on `column` and make it the only sort key.
    ///
    /// A column currently sorted descending becomes ascending; any other
    /// state (ascending or unsorted) becomes descending.
    pub fn toggle_sort(&self, column: &str) -> Self {
        let current = self
            .sort_fields()
            .into_iter()
            .find(|f| f.name == column)
            .map(|f| f.order);

        let next = SortField {
            name: column.to_string(),
            order: match current {
                Some(SortOrder::Desc) => SortOrder::Asc,
                _ => SortOrder::Desc,
            },
        };

        RowQuery {
            sort: Some(vec![next.to_string()]),
            ..self.clone()
        }
    }

    pub fn next_page(&self) -> Self {
        RowQuery {
            offset: self.offset.saturating_add(self.limit),
            ..self.clone()
        }
    }

    /// Previous page, clamped at offset 0
    pub fn prev_page(&self) -> Self {
        RowQuery {
            offset: self.offset.saturating_sub(self.limit),
            ..self.clone()
        }
    }

    /// Change the page size, clamped to `1..=MAX_LIMIT`
    pub fn with_limit(&self, limit: u64) -> Self {
        RowQuery {
            limit: limit.clamp(1, MAX_LIMIT),
            ..self.clone()
        }
    }
}

/// Ordered query parameters produced by [`RowQuery::to_search_params`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(&'static str, String)>,
}

impl SearchParams {
    fn push(&mut self, key: &'static str, value: String) {
        self.pairs.push((key, value));
    }

    fn push_str(&mut self, key: &'static str, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.push(key, v.to_string());
        }
    }

    fn push_list(&mut self, key: &'static str, values: Option<&[String]>) {
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            self.push(key, join_list(values));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Replace the query component of `url` with these parameters
    pub fn apply_to(&self, url: &mut Url) {
        if self.is_empty() {
            url.set_query(None);
            return;
        }
        url.query_pairs_mut().clear().extend_pairs(self.iter());
    }
}

/// Percent-encoded `key=value&...` form
impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish();
        f.write_str(&encoded)
    }
}

/// First occurrence of each recognized parameter
#[derive(Default)]
struct RawParams {
    offset: Option<String>,
    limit: Option<String>,
    sort: Option<String>,
    text_filters: Option<String>,
    text_filters_cols: Option<String>,
    filters: Option<String>,
    filters_args: Option<String>,
    select_cols: Option<String>,
}

impl RawParams {
    fn set_first(&mut self, key: &str, value: String) {
        let slot = match key {
            OFFSET_KEY => &mut self.offset,
            LIMIT_KEY => &mut self.limit,
            SORT_KEY => &mut self.sort,
            TEXT_FILTERS_KEY => &mut self.text_filters,
            TEXT_FILTERS_COLS_KEY => &mut self.text_filters_cols,
            FILTERS_KEY => &mut self.filters,
            FILTERS_ARGS_KEY => &mut self.filters_args,
            SELECT_COLS_KEY => &mut self.select_cols,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}

fn parse_offset(raw: Option<&str>) -> u64 {
    // Negative and non-numeric offsets fail to parse as u64
    raw.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(0)
}

fn parse_limit(raw: Option<&str>, default_limit: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&limit| limit >= 1)
        .unwrap_or(default_limit)
}

/// Split a `|`-delimited list; an empty value means "absent".
pub fn split_list(raw: &str) -> Option<Vec<String>> {
    if raw.is_empty() {
        return None;
    }
    Some(raw.split(LIST_DELIMITER).map(str::to_string).collect())
}

pub fn join_list<S: AsRef<str>>(values: &[S]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(LIST_DELIMITER);
        }
        out.push_str(v.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_query() {
        let q = RowQuery::from_query_str("");
        assert_eq!(q, RowQuery::default());
        assert_eq!(q.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_leading_question_mark_ignored() {
        let q = RowQuery::from_query_str("?offset=5");
        assert_eq!(q.offset, 5);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let q = RowQuery::from_query_str("limit=10&limit=20");
        assert_eq!(q.limit, 10);
    }

    #[test]
    fn test_negative_values_fall_back() {
        let q = RowQuery::from_query_str("offset=-5&limit=-1");
        assert_eq!(q.offset, 0);
        assert_eq!(q.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_zero_limit_falls_back() {
        assert_eq!(RowQuery::from_query_str("limit=0").limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_sort_field_parse() {
        assert_eq!(
            SortField::parse("-age"),
            Some(SortField {
                name: "age".into(),
                order: SortOrder::Desc
            })
        );
        assert_eq!(SortField::parse("name").map(|f| f.order), Some(SortOrder::Asc));
        assert_eq!(SortField::parse(""), None);
    }

    #[test]
    fn test_sort_fields_skip_empty_entries() {
        let q = RowQuery::from_query_str("sort=name||-age|");
        assert_eq!(
            q.sort,
            Some(vec!["name".into(), String::new(), "-age".into(), String::new()])
        );
        let fields: Vec<String> = q.sort_fields().iter().map(ToString::to_string).collect();
        assert_eq!(fields, vec!["name", "-age"]);
    }

    #[test]
    fn test_join_and_split_list() {
        assert_eq!(join_list(&["a", "b", "c"]), "a|b|c");
        assert_eq!(split_list("a|b"), Some(vec!["a".into(), "b".into()]));
        assert_eq!(split_list(""), None);
    }

    #[test]
    fn test_search_params_display_is_percent_encoded() {
        let q = RowQuery {
            filters: Some("name = 'a b'".into()),
            ..RowQuery::default()
        };
        let encoded = q.to_search_params().to_string();
        assert_eq!(encoded, "limit=50&filters=name+%3D+%27a+b%27");
    }

    #[test]
    fn test_apply_to_url() {
        let mut url = Url::parse("http://localhost/users?stale=1").unwrap();
        let q = RowQuery {
            offset: 20,
            ..RowQuery::default()
        };
        q.to_search_params().apply_to(&mut url);
        assert_eq!(url.as_str(), "http://localhost/users?offset=20&limit=50");
        assert_eq!(RowQuery::parse(&url), q);
    }
}
