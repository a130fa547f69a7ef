//! Primary-key filter expressions and row keys.

use pgpanel::pkeys::{pkeys_from_pairs, row_key};
use pgpanel::{multi_rows_filter_expr, pkeys_map_to_filter_expr, PrimaryKeyMap};
use proptest::prelude::*;

#[test]
fn test_empty_map_is_empty_filter() {
    assert_eq!(pkeys_map_to_filter_expr(&PrimaryKeyMap::new()), "");
}

#[test]
fn test_single_key() {
    let pkeys = pkeys_from_pairs([("id", "5")]);
    assert_eq!(pkeys_map_to_filter_expr(&pkeys), "id=5");
}

#[test]
fn test_compound_key() {
    let pkeys = pkeys_from_pairs([("a", "1"), ("b", "2")]);
    assert_eq!(pkeys_map_to_filter_expr(&pkeys), "a=1 AND b=2");
}

#[test]
fn test_multi_row_single_keys_not_parenthesized() {
    let rows = vec![
        pkeys_from_pairs([("id", "1")]),
        pkeys_from_pairs([("id", "2")]),
    ];
    assert_eq!(multi_rows_filter_expr(&rows), "id=1 OR id=2");
}

#[test]
fn test_multi_row_mixed_arity() {
    let rows = vec![
        pkeys_from_pairs([("a", "1"), ("b", "2")]),
        pkeys_from_pairs([("a", "3")]),
    ];
    assert_eq!(multi_rows_filter_expr(&rows), "(a=1 AND b=2) OR a=3");
}

#[test]
fn test_values_are_not_escaped() {
    // Documented limitation: values are interpolated verbatim
    let pkeys = pkeys_from_pairs([("name", "x OR 1=1")]);
    assert_eq!(pkeys_map_to_filter_expr(&pkeys), "name=x OR 1=1");
}

#[test]
fn test_row_key() {
    let pkeys = pkeys_from_pairs([("id", "7")]);
    assert_eq!(row_key("users", &pkeys), "users-7");
    assert_eq!(row_key("users", &PrimaryKeyMap::new()), "users-");
}

proptest! {
    #[test]
    fn prop_one_or_per_nonempty_row(
        rows in prop::collection::vec(
            prop::collection::vec(("[a-z]{1,6}", "[0-9]{1,4}"), 0..3),
            0..6,
        )
    ) {
        let maps: Vec<PrimaryKeyMap> = rows.into_iter().map(pkeys_from_pairs).collect();
        let expr = multi_rows_filter_expr(&maps);
        let nonempty = maps.iter().filter(|m| !m.is_empty()).count();
        prop_assert_eq!(expr.matches(" OR ").count(), nonempty.saturating_sub(1));
        let compound = maps.iter().filter(|m| m.len() > 1).count();
        prop_assert_eq!(expr.matches('(').count(), compound);
    }
}
