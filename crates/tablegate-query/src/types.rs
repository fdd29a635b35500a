use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog type of a column as the store names it, used to cast bound operands.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NativeType {
    /// Namespace the type lives in (e.g. `pg_catalog`)
    pub namespace: Option<String>,
    /// Type name (e.g. `int4`, `timestamptz`, an enum name)
    pub name: String,
}

impl NativeType {
    pub fn new(namespace: Option<String>, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }
}

/// Definition of a single column in a table
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Declared type as reported by the store, or `unknown`
    #[serde(rename = "type")]
    pub declared_type: String,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Catalog type used for operand casts; absent when probed from sample rows
    #[serde(skip)]
    pub native_type: Option<NativeType>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable,
            native_type: None,
        }
    }

    pub fn with_native_type(mut self, native_type: NativeType) -> Self {
        self.native_type = Some(native_type);
        self
    }
}

/// Ordered column list for one table.
///
/// An empty schema means "no columns known": the probe failed or the table
/// yielded nothing to inspect.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    pub fn empty(table: impl Into<String>) -> Self {
        Self::new(table, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Case-sensitive lookup
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Comparison operators accepted in `operator__column` keys
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    Is,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::ILike,
        Operator::In,
        Operator::Is,
    ];

    /// Parse the operator prefix of a parameter key. Matching is exact.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::In => "in",
            Operator::Is => "is",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal accepted by the `is` operator
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum IsLiteral {
    Null,
    True,
    False,
}

impl IsLiteral {
    /// Case-insensitive parse of `null`, `true`, `false`
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "null" => Some(IsLiteral::Null),
            "true" => Some(IsLiteral::True),
            "false" => Some(IsLiteral::False),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IsLiteral::Null => "null",
            IsLiteral::True => "true",
            IsLiteral::False => "false",
        }
    }
}

/// Right-hand side of a filter clause
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Operand {
    Value(String),
    List(Vec<String>),
    Literal(IsLiteral),
}

/// A column reference that has been checked against the table schema.
///
/// `native_type` is copied from the schema so executors can cast operands
/// without a second lookup. It is `None` when the schema was empty.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ColumnRef {
    pub name: String,
    pub native_type: Option<NativeType>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: None,
        }
    }

    pub(crate) fn resolve(name: &str, schema: &TableSchema) -> Self {
        Self {
            name: name.to_string(),
            native_type: schema.column(name).and_then(|c| c.native_type.clone()),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FilterClause {
    pub column: ColumnRef,
    pub operator: Operator,
    pub operand: Operand,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Selection {
    /// `*`
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

/// Fully validated, backend-agnostic description of one read
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct QueryPlan {
    pub table: String,
    pub selection: Selection,
    pub filters: Vec<FilterClause>,
    pub order_by: Option<OrderBy>,
    pub limit: u64,
    pub offset: u64,
    pub want_count: bool,
}

/// A row of data as column → JSON value
pub type DataRow = serde_json::Map<String, serde_json::Value>;

/// Rows returned for a plan, plus the total when it was requested
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub rows: Vec<DataRow>,
    pub total_count: Option<u64>,
}

impl QueryOutput {
    pub fn new(rows: Vec<DataRow>, total_count: Option<u64>) -> Self {
        Self { rows, total_count }
    }
}
