//! Row forms
//!
//! Builds the editable fields of a row insert/update form and converts the
//! user's raw input back into cell values.
//!
//! ```text
//! PgColumn + overrides ──resolve──▶ FormField { lookup, value: InputValue }
//!                                        │ user edits
//!                                        ▼
//!                               FormField::encode ──▶ CellValue
//! ```

use serde::{Deserialize, Serialize};

use crate::inputs::{resolve_input_type, InputKind, InputTypeLookup, OverrideMap};
use crate::pg_types::{PgColumn, PgTable};
use crate::value::{CellValue, Row};

/// Editable representation of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Checked(bool),
    List(Vec<String>),
    Single(String),
}

impl Default for InputValue {
    fn default() -> Self {
        InputValue::Single(String::new())
    }
}

impl InputValue {
    /// Editable form of `value` for a control of kind `lookup`
    pub fn from_cell(value: &CellValue, lookup: &InputTypeLookup) -> Self {
        if lookup.is_array {
            let items = match value {
                CellValue::Null => Vec::new(),
                CellValue::Array(items) => items.iter().map(element_text).collect(),
                other => vec![element_text(other)],
            };
            return InputValue::List(items);
        }

        match (lookup.kind, value) {
            (InputKind::Checkbox, v) => InputValue::Checked(v.is_truthy()),
            (_, CellValue::Null) => InputValue::Single(String::new()),
            (InputKind::JsonTextarea, v) => InputValue::Single(
                serde_json::to_string_pretty(&v.to_json()).unwrap_or_else(|_| v.to_string()),
            ),
            (_, v) => InputValue::Single(v.to_string()),
        }
    }
}

fn element_text(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Object(_) | CellValue::Array(_) => value.to_json().to_string(),
        other => other.to_string(),
    }
}

/// One field of a row form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    /// `name - udtName`
    pub label: String,
    pub lookup: InputTypeLookup,
    pub required: bool,
    pub nullable: bool,
    pub numeric: bool,
    pub value: InputValue,
    /// Value the form was built with
    #[serde(skip)]
    initial: InputValue,
}

impl FormField {
    pub fn new(column: &PgColumn, lookup: InputTypeLookup, current: Option<&CellValue>) -> Self {
        let value = current.map_or_else(
            || InputValue::from_cell(&CellValue::Null, &lookup),
            |v| InputValue::from_cell(v, &lookup),
        );

        FormField {
            name: column.name.clone(),
            label: field_label(column),
            required: !column.is_nullable && column.default.is_none(),
            nullable: column.is_nullable,
            numeric: column.is_numeric_type(),
            lookup,
            initial: value.clone(),
            value,
        }
    }

    /// Whether the value differs from what the form was built with
    pub fn is_touched(&self) -> bool {
        self.value != self.initial
    }

    /// Left out of an insert so the column default applies: optional and
    /// either untouched or cleared.
    fn is_omittable(&self) -> bool {
        !self.required && (!self.is_touched() || self.value == InputValue::default())
    }

    /// Convert raw user input into the value sent to the backend.
    pub fn encode(&self, raw: &InputValue) -> CellValue {
        match raw {
            InputValue::Checked(checked) => CellValue::Bool(*checked),
            InputValue::List(items) if items.is_empty() && self.nullable => CellValue::Null,
            InputValue::List(items) => self.encode_list(items.iter().map(String::as_str)),
            InputValue::Single(text) if self.lookup.is_array => {
                if text.trim().is_empty() && self.nullable {
                    return CellValue::Null;
                }
                self.encode_list(text.split(',').map(str::trim).filter(|s| !s.is_empty()))
            }
            InputValue::Single(text) => self.encode_scalar(text),
        }
    }

    /// Encode the field's current value
    pub fn encoded_value(&self) -> CellValue {
        self.encode(&self.value)
    }

    fn encode_list<'s>(&self, items: impl Iterator<Item = &'s str>) -> CellValue {
        CellValue::Array(items.map(|item| self.encode_element(item)).collect())
    }

    fn encode_element(&self, text: &str) -> CellValue {
        match self.lookup.kind {
            InputKind::Checkbox => CellValue::Bool(parse_checked(text)),
            _ => self.encode_text(text),
        }
    }

    fn encode_scalar(&self, text: &str) -> CellValue {
        if text.is_empty() && self.nullable {
            return CellValue::Null;
        }
        self.encode_element(text)
    }

    fn encode_text(&self, text: &str) -> CellValue {
        match self.lookup.kind {
            InputKind::Input if self.numeric => parse_number(text)
                .unwrap_or_else(|| CellValue::String(text.to_string())),
            InputKind::JsonTextarea => serde_json::from_str::<serde_json::Value>(text)
                .map_or_else(|_| CellValue::String(text.to_string()), CellValue::from),
            _ => CellValue::String(text.to_string()),
        }
    }
}

fn field_label(column: &PgColumn) -> String {
    if column.udt_name.is_empty() {
        column.name.clone()
    } else {
        format!("{} - {}", column.name, column.udt_name)
    }
}

fn parse_checked(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "1" | "yes" | "on"
    )
}

fn parse_number(text: &str) -> Option<CellValue> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(CellValue::from(n));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(CellValue::from)
}

/// Fields for inserting into (`row = None`) or editing a row of `table`.
///
/// One field per column in declaration order; columns overridden to
/// `hidden` are left out.
pub fn build_form(table: &PgTable, row: Option<&Row>, overrides: Option<&OverrideMap>) -> Vec<FormField> {
    table
        .columns
        .iter()
        .filter_map(|column| {
            let lookup = resolve_input_type(column, overrides);
            if lookup.is_hidden() {
                return None;
            }
            let current = row.and_then(|r| r.get(&column.name));
            Some(FormField::new(column, lookup, current))
        })
        .collect()
}

/// Row of encoded values from `fields`.
///
/// With `skip_empty` (inserts), optional fields the user left untouched or
/// cleared are left out so the column default applies.
pub fn form_to_row(fields: &[FormField], skip_empty: bool) -> Row {
    fields
        .iter()
        .filter(|f| !(skip_empty && f.is_omittable()))
        .map(|f| (f.name.clone(), f.encoded_value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pg_types::oid;
    use serde_json::json;

    fn field(column: PgColumn) -> FormField {
        let lookup = resolve_input_type(&column, None);
        FormField::new(&column, lookup, None)
    }

    #[test]
    fn test_label_includes_udt_name() {
        let col = PgColumn::new("tags", oid::TEXT_ARRAY).with_udt_name("_text");
        assert_eq!(field(col).label, "tags - _text");
    }

    #[test]
    fn test_required_flags() {
        assert!(field(PgColumn::new("email", oid::TEXT)).required);
        assert!(!field(PgColumn::new("bio", oid::TEXT).nullable()).required);
        let serial = PgColumn::new("id", oid::INT4)
            .primary_key()
            .with_default("nextval('users_id_seq'::regclass)");
        assert!(!field(serial).required);
    }

    #[test]
    fn test_checkbox_parsing() {
        let f = field(PgColumn::new("active", oid::BOOL));
        for raw in ["true", "t", "1", "YES", "on"] {
            assert_eq!(f.encode(&InputValue::Single(raw.into())), CellValue::Bool(true));
        }
        assert_eq!(f.encode(&InputValue::Single("no".into())), CellValue::Bool(false));
        assert_eq!(f.encode(&InputValue::Checked(true)), CellValue::Bool(true));
    }

    #[test]
    fn test_numeric_input() {
        let f = field(PgColumn::new("price", oid::NUMERIC));
        assert_eq!(f.encode(&InputValue::Single("12".into())), CellValue::from(12_i64));
        assert_eq!(f.encode(&InputValue::Single("1.5".into())), CellValue::from(1.5));
        assert_eq!(
            f.encode(&InputValue::Single("n/a".into())),
            CellValue::from("n/a")
        );
    }

    #[test]
    fn test_uuid_input_stays_text() {
        let f = field(PgColumn::new("token", oid::UUID));
        assert_eq!(f.encode(&InputValue::Single("123".into())), CellValue::from("123"));
    }

    #[test]
    fn test_json_textarea() {
        let f = field(PgColumn::new("meta", oid::JSONB));
        assert_eq!(
            f.encode(&InputValue::Single(r#"{"a": [1]}"#.into())),
            CellValue::from(json!({"a": [1]}))
        );
        assert_eq!(
            f.encode(&InputValue::Single("{broken".into())),
            CellValue::from("{broken")
        );
    }

    #[test]
    fn test_array_split_and_list() {
        let f = field(PgColumn::new("scores", oid::INT4_ARRAY));
        assert_eq!(
            f.encode(&InputValue::Single("1, 2,,3".into())),
            CellValue::from(json!([1, 2, 3]))
        );
        assert_eq!(
            f.encode(&InputValue::List(vec!["4".into()])),
            CellValue::from(json!([4]))
        );
    }

    #[test]
    fn test_empty_nullable_is_null() {
        let f = field(PgColumn::new("bio", oid::TEXT).nullable());
        assert_eq!(f.encode(&InputValue::default()), CellValue::Null);
        let f = field(PgColumn::new("tags", oid::TEXT_ARRAY).nullable());
        assert_eq!(f.encode(&InputValue::List(vec![])), CellValue::Null);
        let f = field(PgColumn::new("tags", oid::TEXT_ARRAY));
        assert_eq!(f.encode(&InputValue::List(vec![])), CellValue::Array(vec![]));
        let f = field(PgColumn::new("email", oid::TEXT));
        assert_eq!(f.encode(&InputValue::default()), CellValue::from(""));
    }

    #[test]
    fn test_from_cell() {
        let lookup = InputTypeLookup::new(InputKind::JsonTextarea);
        assert_eq!(
            InputValue::from_cell(&CellValue::from(json!({"k": 1})), &lookup),
            InputValue::Single("{\n  \"k\": 1\n}".into())
        );
        let lookup = InputTypeLookup::array(InputKind::Textarea);
        assert_eq!(
            InputValue::from_cell(&CellValue::from(json!(["a", null])), &lookup),
            InputValue::List(vec!["a".into(), String::new()])
        );
        assert_eq!(
            InputValue::from_cell(&CellValue::Null, &InputTypeLookup::new(InputKind::Input)),
            InputValue::Single(String::new())
        );
    }

    #[test]
    fn test_form_to_row_skips_empty_optional() {
        let table = PgTable::new(
            "notes",
            vec![
                PgColumn::new("id", oid::INT4).primary_key().with_default("nextval('s')"),
                PgColumn::new("body", oid::TEXT),
            ],
        );
        let mut fields = build_form(&table, None, None);
        fields[1].value = InputValue::Single("hi".into());
        let row = form_to_row(&fields, true);
        assert_eq!(row.len(), 1);
        assert_eq!(row["body"], CellValue::from("hi"));
    }

    #[test]
    fn test_touched_tracking() {
        let mut f = field(PgColumn::new("active", oid::BOOL).with_default("true"));
        assert!(!f.is_touched());
        f.value = InputValue::Checked(true);
        assert!(f.is_touched());
        f.value = InputValue::Checked(false);
        assert!(!f.is_touched());
    }
}
