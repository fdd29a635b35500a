//! Translation of raw query-string parameters into a [`QueryPlan`].
//!
//! Keys are either one of the reserved paging/shape keys or a filter written
//! as `operator__column=value` (`column=value` means `eq`). Every column the
//! plan mentions is checked against the table schema before anything reaches
//! a backing store.

use std::collections::HashSet;
use std::num::IntErrorKind;

use crate::error::ValidationError;
use crate::types::*;

pub const OPERATOR_DELIMITER: &str = "__";

pub const RESERVED_PARAMS: [&str; 6] = ["select", "order", "desc", "limit", "offset", "count"];

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1000;

/// Knobs that shape compilation but are not part of the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Limit applied when the request does not give one
    pub default_limit: u64,
    /// Upper bound for `limit`; larger values are clamped
    pub max_limit: u64,
    /// Reject column references while the schema is empty instead of letting
    /// them through unvalidated
    pub strict_schema: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            strict_schema: false,
        }
    }
}

pub fn is_reserved(key: &str) -> bool {
    RESERVED_PARAMS.contains(&key)
}

/// Build a plan for `table` from request parameters.
///
/// `params` must be in query-string order. Only the first occurrence of a key
/// is honored.
pub fn compile(
    table: &str,
    params: &[(String, String)],
    schema: &TableSchema,
    options: &CompileOptions,
) -> Result<QueryPlan, ValidationError> {
    let mut seen = HashSet::new();

    let mut select = None;
    let mut order = None;
    let mut desc = None;
    let mut limit = None;
    let mut offset = None;
    let mut count = None;
    let mut filters = Vec::new();

    for (key, value) in params {
        if !seen.insert(key.as_str()) {
            continue;
        }

        let value = value.as_str();
        match key.as_str() {
            "select" => select = Some(value),
            "order" => order = Some(value),
            "desc" => desc = Some(value),
            "limit" => limit = Some(value),
            "offset" => offset = Some(value),
            "count" => count = Some(value),
            _ => {
                if let Some(clause) = compile_filter(key, value, schema, options)? {
                    filters.push(clause);
                }
            }
        }
    }

    let selection = compile_select(select, schema, options)?;

    let direction = match desc {
        Some(raw) => {
            if parse_flag(raw).ok_or_else(|| ValidationError::InvalidParameter {
                parameter: "desc",
                value: raw.to_string(),
                expected: "true or false",
            })? {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            }
        }
        None => SortDirection::Asc,
    };

    let order_by = match order.map(str::trim).filter(|o| !o.is_empty()) {
        Some(column) => Some(OrderBy {
            column: check_column(column, schema, options)?,
            direction,
        }),
        None => None,
    };

    let default_limit = options.default_limit.clamp(1, options.max_limit.max(1));
    let limit = match non_blank(limit) {
        Some(raw) => parse_integer("limit", raw)?.clamp(1, options.max_limit.max(1) as i64) as u64,
        None => default_limit,
    };

    let offset = match non_blank(offset) {
        Some(raw) => parse_integer("offset", raw)?.max(0) as u64,
        None => 0,
    };

    let want_count = count.map(wants_count).unwrap_or(false);

    Ok(QueryPlan {
        table: table.to_string(),
        selection,
        filters,
        order_by,
        limit,
        offset,
        want_count,
    })
}

fn compile_filter(
    key: &str,
    value: &str,
    schema: &TableSchema,
    options: &CompileOptions,
) -> Result<Option<FilterClause>, ValidationError> {
    let (operator, column) = match key.split_once(OPERATOR_DELIMITER) {
        Some((prefix, column)) => {
            let operator =
                Operator::parse(prefix).ok_or_else(|| ValidationError::UnknownOperator {
                    operator: prefix.to_string(),
                    key: key.to_string(),
                })?;
            (operator, column)
        }
        None => (Operator::Eq, key),
    };

    let column = check_column(column, schema, options)?;

    // `status=` carries no constraint
    if value.is_empty() {
        return Ok(None);
    }

    let operand = match operator {
        Operator::In => {
            let items: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
            if items.is_empty() {
                return Ok(None);
            }
            Operand::List(items)
        }
        Operator::Is => {
            let literal =
                IsLiteral::parse(value.trim()).ok_or_else(|| ValidationError::InvalidOperand {
                    operator: operator.to_string(),
                    column: column.name.clone(),
                    value: value.to_string(),
                    expected: "null, true or false",
                })?;
            Operand::Literal(literal)
        }
        _ => Operand::Value(value.to_string()),
    };

    Ok(Some(FilterClause {
        column,
        operator,
        operand,
    }))
}

fn compile_select(
    raw: Option<&str>,
    schema: &TableSchema,
    options: &CompileOptions,
) -> Result<Selection, ValidationError> {
    let raw = match raw.map(str::trim) {
        None | Some("") | Some("*") => return Ok(Selection::All),
        Some(raw) => raw,
    };

    let columns: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    if columns.is_empty() {
        return Ok(Selection::All);
    }

    if schema.is_empty() {
        if options.strict_schema {
            return Err(ValidationError::SchemaUnavailable {
                column: columns[0].clone(),
            });
        }
        return Ok(Selection::Columns(columns));
    }

    let invalid: Vec<String> = columns
        .iter()
        .filter(|c| !schema.has_column(c))
        .cloned()
        .collect();

    if !invalid.is_empty() {
        return Err(ValidationError::InvalidSelect { columns: invalid });
    }

    Ok(Selection::Columns(columns))
}

fn check_column(
    name: &str,
    schema: &TableSchema,
    options: &CompileOptions,
) -> Result<ColumnRef, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::UnknownColumn {
            column: String::new(),
        });
    }

    if schema.is_empty() {
        if options.strict_schema {
            return Err(ValidationError::SchemaUnavailable {
                column: name.to_string(),
            });
        }
        return Ok(ColumnRef::new(name));
    }

    if schema.has_column(name) {
        Ok(ColumnRef::resolve(name, schema))
    } else {
        Err(ValidationError::UnknownColumn {
            column: name.to_string(),
        })
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

/// Integers too large for `i64` saturate so the caller's clamp applies
fn parse_integer(parameter: &'static str, raw: &str) -> Result<i64, ValidationError> {
    match raw.parse::<i64>() {
        Ok(value) => Ok(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(i64::MAX),
            IntErrorKind::NegOverflow => Ok(i64::MIN),
            _ => Err(ValidationError::InvalidParameter {
                parameter,
                value: raw.to_string(),
                expected: "an integer",
            }),
        },
    }
}

/// `true`/`1`/`yes` and an empty value are true, `false`/`0`/`no` false
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn wants_count(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "none"
    )
}
