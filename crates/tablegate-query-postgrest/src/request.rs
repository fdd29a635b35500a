//! Translation of a [`QueryPlan`] into PostgREST query parameters.

use tablegate_query::{DataRow, IsLiteral, Operand, Operator, QueryPlan, Selection};
use tablegate_query::{ColumnDescriptor, TableSchema};

/// Declared type reported for columns learned from a sample row
pub const UNKNOWN_TYPE: &str = "unknown";

fn operator_token(operator: Operator) -> &'static str {
    match operator {
        Operator::Eq => "eq",
        Operator::Ne => "neq",
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

/// Double-quote a list item or identifier so commas, dots, parentheses and
/// operator words stay literal
fn quote(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

fn filter_value(operator: Operator, operand: &Operand) -> String {
    let token = operator_token(operator);
    match operand {
        Operand::Value(value) => format!("{}.{}", token, value),
        Operand::List(items) => format!(
            "{}.({})",
            token,
            items
                .iter()
                .map(|i| quote(i))
                .collect::<Vec<_>>()
                .join(",")
        ),
        Operand::Literal(literal) => format!(
            "{}.{}",
            token,
            match literal {
                IsLiteral::Null => "null",
                IsLiteral::True => "true",
                IsLiteral::False => "false",
            }
        ),
    }
}

/// Query-string pairs for a plan, in a stable order: `select`, filters as
/// given, `order`, `limit`, `offset`.
///
/// Column names are always sent quoted. Unquoted, PostgREST would read
/// `staff(password)` as an embedded table, `staff.role` as a filter on one and
/// `or` as a logic group.
pub fn query_pairs(plan: &QueryPlan) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(plan.filters.len() + 4);

    let select = match &plan.selection {
        Selection::All => "*".to_string(),
        Selection::Columns(columns) => columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(","),
    };
    pairs.push(("select".to_string(), select));

    for clause in &plan.filters {
        pairs.push((
            quote(&clause.column.name),
            filter_value(clause.operator, &clause.operand),
        ));
    }

    if let Some(order) = &plan.order_by {
        let direction = match order.direction {
            tablegate_query::SortDirection::Asc => "asc",
            tablegate_query::SortDirection::Desc => "desc",
        };
        pairs.push((
            "order".to_string(),
            format!("{}.{}", quote(&order.column.name), direction),
        ));
    }

    pairs.push(("limit".to_string(), plan.limit.to_string()));
    pairs.push(("offset".to_string(), plan.offset.to_string()));
    pairs
}

/// Total from a `Content-Range` header such as `0-9/42`. `*` means the
/// server did not count.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Schema inferred from the keys of a sample row. Types are not knowable this
/// way so every column is `unknown` and nullable.
pub fn schema_from_sample(table: &str, sample: Option<&DataRow>) -> TableSchema {
    let columns = sample
        .map(|row| {
            row.keys()
                .map(|name| ColumnDescriptor::new(name.clone(), UNKNOWN_TYPE, true))
                .collect()
        })
        .unwrap_or_default();
    TableSchema::new(table, columns)
}
