//! PostgreSQL Schema Types
//!
//! Column and table metadata as reported by the panel backend's schema
//! endpoint (`GET /api/schema/tables`), plus the built-in type OIDs the
//! panel knows how to edit.
//!
//! ## Example Payload
//!
//! ```json
//! {
//!   "users": {
//!     "name": "users",
//!     "schema": "public",
//!     "columns": [
//!       { "name": "id", "OID": 23, "regType": "integer", "udtName": "int4",
//!         "isText": false, "isNullable": false, "isPrimaryKey": true }
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// PostgreSQL type OID
pub type Oid = u32;

/// Built-in PostgreSQL type OIDs (from `pg_type.dat`).
pub mod oid {
    use super::Oid;

    pub const BOOL: Oid = 16;
    pub const BYTEA: Oid = 17;
    pub const QCHAR: Oid = 18;
    pub const NAME: Oid = 19;
    pub const INT8: Oid = 20;
    pub const INT2: Oid = 21;
    pub const INT4: Oid = 23;
    pub const TEXT: Oid = 25;
    pub const OID: Oid = 26;
    pub const TID: Oid = 27;
    pub const XID: Oid = 28;
    pub const CID: Oid = 29;
    pub const JSON: Oid = 114;
    pub const XML: Oid = 142;
    pub const XML_ARRAY: Oid = 143;
    pub const JSON_ARRAY: Oid = 199;
    pub const POINT: Oid = 600;
    pub const LSEG: Oid = 601;
    pub const PATH: Oid = 602;
    pub const BOX: Oid = 603;
    pub const POLYGON: Oid = 604;
    pub const LINE: Oid = 628;
    pub const LINE_ARRAY: Oid = 629;
    pub const CIDR: Oid = 650;
    pub const CIDR_ARRAY: Oid = 651;
    pub const FLOAT4: Oid = 700;
    pub const FLOAT8: Oid = 701;
    pub const UNKNOWN: Oid = 705;
    pub const CIRCLE: Oid = 718;
    pub const CIRCLE_ARRAY: Oid = 719;
    pub const MACADDR8: Oid = 774;
    pub const MACADDR: Oid = 829;
    pub const INET: Oid = 869;
    pub const BOOL_ARRAY: Oid = 1000;
    pub const BYTEA_ARRAY: Oid = 1001;
    pub const QCHAR_ARRAY: Oid = 1002;
    pub const NAME_ARRAY: Oid = 1003;
    pub const INT2_ARRAY: Oid = 1005;
    pub const INT4_ARRAY: Oid = 1007;
    pub const TEXT_ARRAY: Oid = 1009;
    pub const TID_ARRAY: Oid = 1010;
    pub const XID_ARRAY: Oid = 1011;
    pub const CID_ARRAY: Oid = 1012;
    pub const BPCHAR_ARRAY: Oid = 1014;
    pub const VARCHAR_ARRAY: Oid = 1015;
    pub const INT8_ARRAY: Oid = 1016;
    pub const POINT_ARRAY: Oid = 1017;
    pub const LSEG_ARRAY: Oid = 1018;
    pub const PATH_ARRAY: Oid = 1019;
    pub const BOX_ARRAY: Oid = 1020;
    pub const FLOAT4_ARRAY: Oid = 1021;
    pub const FLOAT8_ARRAY: Oid = 1022;
    pub const POLYGON_ARRAY: Oid = 1027;
    pub const OID_ARRAY: Oid = 1028;
    pub const ACLITEM: Oid = 1033;
    pub const ACLITEM_ARRAY: Oid = 1034;
    pub const MACADDR_ARRAY: Oid = 1040;
    pub const INET_ARRAY: Oid = 1041;
    pub const BPCHAR: Oid = 1042;
    pub const VARCHAR: Oid = 1043;
    pub const DATE: Oid = 1082;
    pub const TIME: Oid = 1083;
    pub const TIMESTAMP: Oid = 1114;
    pub const TIMESTAMP_ARRAY: Oid = 1115;
    pub const DATE_ARRAY: Oid = 1182;
    pub const TIME_ARRAY: Oid = 1183;
    pub const TIMESTAMPTZ: Oid = 1184;
    pub const TIMESTAMPTZ_ARRAY: Oid = 1185;
    pub const INTERVAL: Oid = 1186;
    pub const INTERVAL_ARRAY: Oid = 1187;
    pub const NUMERIC_ARRAY: Oid = 1231;
    pub const TIMETZ: Oid = 1266;
    pub const TIMETZ_ARRAY: Oid = 1270;
    pub const BIT: Oid = 1560;
    pub const BIT_ARRAY: Oid = 1561;
    pub const VARBIT: Oid = 1562;
    pub const VARBIT_ARRAY: Oid = 1563;
    pub const NUMERIC: Oid = 1700;
    pub const RECORD: Oid = 2249;
    pub const RECORD_ARRAY: Oid = 2287;
    pub const UUID: Oid = 2950;
    pub const UUID_ARRAY: Oid = 2951;
    pub const JSONB: Oid = 3802;
    pub const JSONB_ARRAY: Oid = 3807;
    pub const INT4RANGE: Oid = 3904;
    pub const INT4RANGE_ARRAY: Oid = 3905;
    pub const NUMRANGE: Oid = 3906;
    pub const NUMRANGE_ARRAY: Oid = 3907;
    pub const TSRANGE: Oid = 3908;
    pub const TSRANGE_ARRAY: Oid = 3909;
    pub const TSTZRANGE: Oid = 3910;
    pub const TSTZRANGE_ARRAY: Oid = 3911;
    pub const DATERANGE: Oid = 3912;
    pub const DATERANGE_ARRAY: Oid = 3913;
    pub const INT8RANGE: Oid = 3926;
    pub const INT8RANGE_ARRAY: Oid = 3927;
    pub const JSONPATH: Oid = 4072;
    pub const JSONPATH_ARRAY: Oid = 4073;
    pub const INT4MULTIRANGE: Oid = 4451;
    pub const NUMMULTIRANGE: Oid = 4532;
    pub const TSMULTIRANGE: Oid = 4533;
    pub const TSTZMULTIRANGE: Oid = 4534;
    pub const DATEMULTIRANGE: Oid = 4535;
    pub const INT8MULTIRANGE: Oid = 4536;
    pub const INT4MULTIRANGE_ARRAY: Oid = 6150;
    pub const NUMMULTIRANGE_ARRAY: Oid = 6151;
    pub const TSMULTIRANGE_ARRAY: Oid = 6152;
    pub const TSTZMULTIRANGE_ARRAY: Oid = 6153;
    pub const DATEMULTIRANGE_ARRAY: Oid = 6155;
    pub const INT8MULTIRANGE_ARRAY: Oid = 6157;
}

/// Textual column types (searchable with `ILIKE`)
pub fn is_text_oid(type_oid: Oid) -> bool {
    matches!(
        type_oid,
        oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::NAME | oid::QCHAR
    )
}

/// Numeric column types (edited as numbers)
pub fn is_numeric_oid(type_oid: Oid) -> bool {
    matches!(
        type_oid,
        oid::INT2
            | oid::INT4
            | oid::INT8
            | oid::FLOAT4
            | oid::FLOAT8
            | oid::NUMERIC
            | oid::INT2_ARRAY
            | oid::INT4_ARRAY
            | oid::INT8_ARRAY
            | oid::FLOAT4_ARRAY
            | oid::FLOAT8_ARRAY
            | oid::NUMERIC_ARRAY
    )
}

/// Foreign key reference of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyInfo {
    pub table_name: String,
    pub column_name: String,
    #[serde(default)]
    pub constraint_name: String,
}

/// Static metadata of one table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PgColumn {
    pub name: String,

    /// Type OID of the declared data type
    #[serde(rename = "OID")]
    pub oid: Oid,

    /// `regtype` rendering, e.g. `timestamp with time zone`
    #[serde(default)]
    pub reg_type: String,

    /// Underlying type name, e.g. `timestamptz` or `_int4` for arrays
    #[serde(default)]
    pub udt_name: String,

    #[serde(default)]
    pub is_text: bool,

    #[serde(default)]
    pub is_nullable: bool,

    /// Column default expression (`nextval(...)`, `now()`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default)]
    pub is_primary_key: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyInfo>,
}

impl PgColumn {
    /// Create a column with the given name and type; everything else defaulted.
    pub fn new(name: impl Into<String>, type_oid: Oid) -> Self {
        PgColumn {
            name: name.into(),
            oid: type_oid,
            reg_type: String::new(),
            udt_name: String::new(),
            is_text: is_text_oid(type_oid),
            is_nullable: false,
            default: None,
            is_primary_key: false,
            foreign_key: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_udt_name(mut self, udt_name: impl Into<String>) -> Self {
        self.udt_name = udt_name.into();
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyInfo {
            table_name: table.into(),
            column_name: column.into(),
            constraint_name: String::new(),
        });
        self
    }

    /// Text column, either flagged by the backend or by its OID
    pub fn is_text_type(&self) -> bool {
        self.is_text || is_text_oid(self.oid)
    }

    pub fn is_numeric_type(&self) -> bool {
        is_numeric_oid(self.oid)
    }

    /// Quoted identifier for use in SQL
    pub fn safe_name(&self) -> String {
        format!("\"{}\"", self.name)
    }
}

/// Table metadata with its columns in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgTable {
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub columns: Vec<PgColumn>,
    /// Key column names, when the backend reports them at table level
    #[serde(rename = "primaryKeys", default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key_columns: Vec<String>,
}

fn default_schema() -> String {
    "public".to_string()
}

impl PgTable {
    pub fn new(name: impl Into<String>, columns: Vec<PgColumn>) -> Self {
        PgTable {
            name: name.into(),
            schema: default_schema(),
            columns,
            primary_key_columns: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&PgColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns matching `names`, in the order requested. Unknown names are skipped.
    pub fn columns_by_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<&PgColumn> {
        names
            .iter()
            .filter_map(|name| self.column(name.as_ref()))
            .collect()
    }

    /// Primary key columns in declaration order
    pub fn primary_keys(&self) -> impl Iterator<Item = &PgColumn> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key || self.primary_key_columns.contains(&c.name))
    }

    pub fn primary_key_names(&self) -> Vec<&str> {
        self.primary_keys().map(|c| c.name.as_str()).collect()
    }

    pub fn text_columns(&self) -> impl Iterator<Item = &PgColumn> {
        self.columns.iter().filter(|c| c.is_text_type())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First column holding a foreign key into `foreign_table`
    pub fn foreign_key_column_for(&self, foreign_table: &str) -> Option<&PgColumn> {
        self.columns.iter().find(|c| {
            c.foreign_key
                .as_ref()
                .is_some_and(|fk| fk.table_name == foreign_table)
        })
    }

    /// Fully qualified, quoted name for use in SQL
    pub fn safe_name(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.name)
    }
}

/// Table name -> table metadata, as returned by the schema endpoint
pub type TablesMap = BTreeMap<String, PgTable>;
