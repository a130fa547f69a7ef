//! Row query codec: decoding defaults, encoding, round trips, view helpers.

use pgpanel::pg_types::oid;
use pgpanel::row_query::{DEFAULT_LIMIT, MAX_LIMIT};
use pgpanel::{Filters, PgColumn, PgTable, RowQuery, SortOrder};
use proptest::prelude::*;
use url::Url;

fn round_trip(q: &RowQuery) -> RowQuery {
    RowQuery::from_query_str(&q.to_search_params().to_string())
}

// Decode Tests
#[test]
fn test_parse_full_url() {
    let url = Url::parse(
        "http://panel.local/users?offset=50&limit=25&sort=name%7C-age&textFilters=bob&textFiltersCols=name|email&selectCols=id|name",
    )
    .unwrap();
    let q = RowQuery::parse(&url);
    assert_eq!(q.offset, 50);
    assert_eq!(q.limit, 25);
    assert_eq!(q.sort, Some(vec!["name".into(), "-age".into()]));
    assert_eq!(q.text_filters.as_deref(), Some("bob"));
    assert_eq!(q.text_filters_cols, Some(vec!["name".into(), "email".into()]));
    assert_eq!(q.select_cols, Some(vec!["id".into(), "name".into()]));
    assert_eq!(q.filters, None);
}

#[test]
fn test_non_numeric_limit_defaults() {
    assert_eq!(RowQuery::from_query_str("limit=abc").limit, 50);
    assert_eq!(RowQuery::from_query_str("offset=abc").offset, 0);
    assert_eq!(RowQuery::from_query_str("limit=2.5").limit, DEFAULT_LIMIT);
}

#[test]
fn test_custom_default_limit() {
    assert_eq!(RowQuery::from_query_str_with_limit("sort=id", 20).limit, 20);
    assert_eq!(RowQuery::from_query_str_with_limit("limit=abc", 20).limit, 20);
    assert_eq!(RowQuery::from_query_str_with_limit("limit=7", 20).limit, 7);
}

#[test]
fn test_empty_values_are_absent() {
    let q = RowQuery::from_query_str("sort=&filters=&textFilters=&selectCols=");
    assert_eq!(q, RowQuery::default());
}

#[test]
fn test_unknown_parameters_ignored() {
    let q = RowQuery::from_query_str("page=3&offset=10&foo=bar");
    assert_eq!(q.offset, 10);
    assert_eq!(q.limit, DEFAULT_LIMIT);
}

#[test]
fn test_filters_are_opaque() {
    let q = RowQuery::from_query_str("filters=name+%3D+%241+AND+age+%3E+%242&filtersArgs=bob|30");
    assert_eq!(q.filters.as_deref(), Some("name = $1 AND age > $2"));
    assert_eq!(q.filters_args, Some(vec!["bob".into(), "30".into()]));
}

// Encode Tests
#[test]
fn test_round_trip_example() {
    let q = RowQuery {
        offset: 10,
        limit: 25,
        sort: Some(vec!["name".into(), "-age".into()]),
        filters: Some("id=1".into()),
        ..RowQuery::default()
    };
    assert_eq!(round_trip(&q), q);
}

#[test]
fn test_encode_omits_falsy_fields() {
    let q = RowQuery {
        offset: 0,
        limit: 0,
        sort: Some(vec![]),
        text_filters: Some(String::new()),
        ..RowQuery::default()
    };
    assert!(q.to_search_params().is_empty());
}

#[test]
fn test_zero_offset_is_indistinguishable_from_unset() {
    let q = RowQuery {
        offset: 0,
        ..RowQuery::default()
    };
    let params = q.to_search_params();
    assert_eq!(params.get("offset"), None);
    assert_eq!(round_trip(&q).offset, 0);
}

#[test]
fn test_list_fields_joined_with_pipe() {
    let q = RowQuery {
        select_cols: Some(vec!["id".into(), "email".into()]),
        ..RowQuery::default()
    };
    assert_eq!(q.to_search_params().get("selectCols"), Some("id|email"));
}

// Filter Precedence Tests
#[test]
fn test_text_search_takes_precedence() {
    let q = RowQuery::from_query_str("textFilters=ann&filters=id%3D1");
    assert_eq!(
        q.active_filters(),
        Filters::TextSearch {
            text: "ann".into(),
            cols: vec![]
        }
    );
}

#[test]
fn test_active_filter_renders_against_table() {
    let table = PgTable::new(
        "users",
        vec![
            PgColumn::new("id", oid::INT4).primary_key(),
            PgColumn::new("name", oid::TEXT),
        ],
    );
    let q = RowQuery::from_query_str("textFilters=Ann");
    let sql = q.active_filters().to_sql(&table);
    assert_eq!(sql.statement, "\"name\"::text ILIKE $1");
    assert_eq!(sql.args, vec!["%ann%"]);
}

// View Helper Tests
#[test]
fn test_with_search_resets_offset() {
    let q = RowQuery::from_query_str("offset=100&filters=id%3D1");
    let text = q.with_search("bob", false);
    assert_eq!(text.offset, 0);
    assert_eq!(text.text_filters.as_deref(), Some("bob"));
    assert_eq!(text.filters, None);

    let sql = q.with_search("age > 3", true);
    assert_eq!(sql.filters.as_deref(), Some("age > 3"));
    assert_eq!(sql.text_filters, None);

    let cleared = q.with_search("", false);
    assert_eq!(cleared.filters, None);
    assert_eq!(cleared.text_filters, None);
}

#[test]
fn test_toggle_sort_cycle() {
    let q = RowQuery::from_query_str("sort=name|-age");
    let age = q.toggle_sort("age");
    assert_eq!(age.sort, Some(vec!["age".into()]));
    let fields = age.sort_fields();
    assert_eq!(fields[0].order, SortOrder::Asc);

    let desc = age.toggle_sort("age");
    assert_eq!(desc.sort, Some(vec!["-age".into()]));
    assert_eq!(q.toggle_sort("email").sort, Some(vec!["-email".into()]));
}

#[test]
fn test_pagination() {
    let q = RowQuery::from_query_str("limit=20");
    let next = q.next_page().next_page();
    assert_eq!(next.offset, 40);
    assert_eq!(next.prev_page().offset, 20);
    assert_eq!(q.prev_page().offset, 0);
    assert_eq!(q.with_limit(0).limit, 1);
    assert_eq!(q.with_limit(10_000).limit, MAX_LIMIT);
}

fn list_item() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,8}"
}

fn opt_list() -> impl Strategy<Value = Option<Vec<String>>> {
    prop::option::of(prop::collection::vec(list_item(), 1..4))
}

fn opt_text() -> impl Strategy<Value = Option<String>> {
    // Arbitrary printable text, including `&`, `=`, `%` and spaces
    prop::option::of("[ -~]{1,20}")
}

prop_compose! {
    fn arb_query()(
        offset in 1u64..10_000,
        limit in 1u64..1_000,
        sort in opt_list(),
        text_filters in opt_text(),
        text_filters_cols in opt_list(),
        filters in opt_text(),
        filters_args in opt_list(),
        select_cols in opt_list(),
    ) -> RowQuery {
        RowQuery { offset, limit, sort, text_filters, text_filters_cols, filters, filters_args, select_cols }
    }
}

proptest! {
    #[test]
    fn prop_round_trip_preserves_truthy_queries(q in arb_query()) {
        prop_assert_eq!(round_trip(&q), q);
    }

    #[test]
    fn prop_decoding_never_panics(raw in "[ -~]{0,64}") {
        let q = RowQuery::from_query_str(&raw);
        prop_assert!(q.limit >= 1);
    }
}
