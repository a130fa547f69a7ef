//! Primary-key identity of rows
//!
//! A row is targeted for update or delete by a filter built from its primary
//! key values:
//!
//! ```text
//! {id: "5"}                      → id=5
//! {a: "1", b: "2"}               → a=1 AND b=2
//! [{id: "1"}, {id: "2"}]         → id=1 OR id=2
//! [{a: "1", b: "2"}, {a: "3", b: "4"}] → (a=1 AND b=2) OR (a=3 AND b=4)
//! ```
//!
//! Values are interpolated verbatim. A value containing `=`, ` AND `, ` OR `
//! or `|` corrupts the expression; callers must not pass such values.

use indexmap::IndexMap;

/// Primary key column -> string-encoded value, in the table's declaration order
pub type PrimaryKeyMap = IndexMap<String, String>;

const AND: &str = " AND ";
const OR: &str = " OR ";

/// Filter expression selecting the single row identified by `pkeys`.
///
/// An empty map yields an empty string, which the backend treats as "no
/// filter". Callers must not send it as a delete or update target.
pub fn pkeys_map_to_filter_expr(pkeys: &PrimaryKeyMap) -> String {
    pkeys
        .iter()
        .map(|(column, value)| format!("{column}={value}"))
        .collect::<Vec<_>>()
        .join(AND)
}

/// Filter expression selecting every row in `rows`.
///
/// Compound per-row expressions are parenthesized; rows with an empty key
/// map are skipped.
pub fn multi_rows_filter_expr(rows: &[PrimaryKeyMap]) -> String {
    rows.iter()
        .filter(|pkeys| !pkeys.is_empty())
        .map(|pkeys| {
            let expr = pkeys_map_to_filter_expr(pkeys);
            if pkeys.len() > 1 {
                format!("({expr})")
            } else {
                expr
            }
        })
        .collect::<Vec<_>>()
        .join(OR)
}

/// Stable UI key of a row: `table-value1-value2...`.
///
/// Not unique when key values themselves contain `-`.
pub fn row_key(table_name: &str, pkeys: &PrimaryKeyMap) -> String {
    let mut key = String::from(table_name);
    key.push('-');
    key.push_str(&pkeys.values().map(String::as_str).collect::<Vec<_>>().join("-"));
    key
}

/// Build a key map from `(column, value)` pairs, keeping their order
pub fn pkeys_from_pairs<K, V, I>(pairs: I) -> PrimaryKeyMap
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
