//! SQL rendering for compiled plans.
//!
//! Identifiers come from a validated plan and are always double-quoted.
//! Operands are only ever bound as `$n` parameters.

use sea_orm::{DatabaseBackend, Statement, Value};
use tablegate_query::{
    ColumnRef, FilterClause, IsLiteral, NativeType, Operand, Operator, QueryError, QueryPlan,
    Result, Selection,
};

/// Statements needed to answer one plan
#[derive(Debug, Clone)]
pub struct SelectStatements {
    /// Yields one `row` column holding each record as a JSON object
    pub rows: Statement,
    /// Yields one `total` column; present only when the plan asks for a count
    pub count: Option<Statement>,
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn quote_type(native: &NativeType) -> String {
    match &native.namespace {
        Some(namespace) => format!("{}.{}", quote_ident(namespace), quote_ident(&native.name)),
        None => quote_ident(&native.name),
    }
}

#[derive(Default)]
struct Params {
    values: Vec<Value>,
}

impl Params {
    fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    /// Bind a raw operand, cast to the column's type when it is known
    fn bind_for(&mut self, column: &ColumnRef, raw: &str) -> String {
        let placeholder = self.bind(raw.to_string());
        match &column.native_type {
            Some(native) => format!("CAST({} AS {})", placeholder, quote_type(native)),
            None => placeholder,
        }
    }
}

/// Left-hand side of a comparison. Columns of unknown type compare as text.
fn column_expr(column: &ColumnRef) -> String {
    match column.native_type {
        Some(_) => quote_ident(&column.name),
        None => format!("{}::text", quote_ident(&column.name)),
    }
}

fn comparison_sql(operator: Operator) -> &'static str {
    match operator {
        Operator::Eq => "=",
        Operator::Ne => "<>",
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        Operator::Like => "LIKE",
        Operator::ILike => "ILIKE",
        Operator::In => "IN",
        Operator::Is => "IS",
    }
}

fn render_filter(clause: &FilterClause, params: &mut Params) -> Result<String> {
    let column = &clause.column;

    let sql = match (clause.operator, &clause.operand) {
        (Operator::Is, Operand::Literal(literal)) => {
            let literal = match literal {
                IsLiteral::Null => "NULL",
                IsLiteral::True => "TRUE",
                IsLiteral::False => "FALSE",
            };
            format!("{} IS {}", quote_ident(&column.name), literal)
        }
        (Operator::In, Operand::List(items)) if !items.is_empty() => {
            let placeholders: Vec<String> = items
                .iter()
                .map(|item| params.bind_for(column, item))
                .collect();
            format!("{} IN ({})", column_expr(column), placeholders.join(", "))
        }
        (op @ (Operator::Like | Operator::ILike), Operand::Value(value)) => format!(
            "{}::text {} {}",
            quote_ident(&column.name),
            comparison_sql(op),
            params.bind(value.clone())
        ),
        (
            op @ (Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte),
            Operand::Value(value),
        ) => format!(
            "{} {} {}",
            column_expr(column),
            comparison_sql(op),
            params.bind_for(column, value)
        ),
        (op, operand) => {
            return Err(QueryError::QueryFailed(format!(
                "Operator '{}' cannot be applied to operand {:?} on column '{}'",
                op, operand, column.name
            )))
        }
    };

    Ok(sql)
}

fn where_clause(filters: &[FilterClause], params: &mut Params) -> Result<String> {
    if filters.is_empty() {
        return Ok(String::new());
    }

    let conditions = filters
        .iter()
        .map(|clause| render_filter(clause, params))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(" WHERE {}", conditions.join(" AND ")))
}

/// Render the rows query, and the count query when requested, for `plan`
/// against tables in `schema`.
pub fn build_select(schema: &str, plan: &QueryPlan) -> Result<SelectStatements> {
    let table = qualified_table(schema, &plan.table);
    let mut params = Params::default();
    let filter_sql = where_clause(&plan.filters, &mut params)?;

    let count = plan.want_count.then(|| {
        Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            format!("SELECT COUNT(*) AS \"total\" FROM {}{}", table, filter_sql),
            params.values.clone(),
        )
    });

    let projection = match &plan.selection {
        Selection::All => "*".to_string(),
        Selection::Columns(columns) => columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", "),
    };

    let mut inner = format!("SELECT {} FROM {}{}", projection, table, filter_sql);

    if let Some(order) = &plan.order_by {
        inner.push_str(&format!(
            " ORDER BY {} {}",
            quote_ident(&order.column.name),
            order.direction.as_sql()
        ));
    }

    let limit = params.bind(i64::try_from(plan.limit).unwrap_or(i64::MAX));
    let offset = params.bind(i64::try_from(plan.offset).unwrap_or(i64::MAX));
    inner.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

    let rows = Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        format!("SELECT row_to_json(t) AS \"row\" FROM ({}) AS t", inner),
        params.values,
    );

    Ok(SelectStatements { rows, count })
}

/// Column listing for one table, in declaration order
pub fn describe_table(schema: &str, table: &str) -> Statement {
    Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        r#"SELECT column_name::text AS column_name,
                  data_type::text AS data_type,
                  is_nullable::text AS is_nullable,
                  udt_schema::text AS udt_schema,
                  udt_name::text AS udt_name
           FROM information_schema.columns
           WHERE table_schema = $1 AND table_name = $2
           ORDER BY ordinal_position"#,
        [schema.into(), table.into()],
    )
}
