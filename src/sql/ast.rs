use bson::Bson;

/// A literal value from SQL source, or a reference to a field, or an
/// already-translated MongoDB expression. Literals carry a `quoted` flag:
/// a quoted source token is always a string; an unquoted token undergoes
/// numeric/NULL/boolean coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    FieldRef(String),
    Expr(Bson),
}

impl Value {
    /// Coerce a raw SQL literal token into a `Value`, honouring whether the
    /// source token was quoted.
    pub fn from_literal(text: &str, quoted: bool) -> Value {
        if quoted {
            return Value::Str(text.to_string());
        }
        let upper = text.to_uppercase();
        if upper == "NULL" {
            return Value::Null;
        }
        if upper == "TRUE" {
            return Value::Bool(true);
        }
        if upper == "FALSE" {
            return Value::Bool(false);
        }
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
        Value::FieldRef(text.to_string())
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Value::Null => Bson::Null,
            Value::Bool(b) => Bson::Boolean(*b),
            Value::Int(i) => Bson::Int64(*i),
            Value::Float(f) => Bson::Double(*f),
            Value::Str(s) => Bson::String(s.clone()),
            Value::FieldRef(f) => Bson::String(format!("${f}")),
            Value::Expr(e) => e.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    /// Verbatim body of the `OVER (...)` parenthesis, used for diagnostics.
    pub raw: String,
    /// `PARTITION BY` fields — recognised syntactically but, per spec, not
    /// emitted by the window translator.
    pub partition_by: Vec<String>,
    pub order_by: Vec<OrderByItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub field: String,
    pub dir: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub cond: String,
    pub then: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexpOp {
    Regexp,
    Rlike,
    NotRegexp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Star,
    Plain {
        name: String,
        table_qualifier: Option<String>,
        alias: Option<String>,
    },
    Function {
        name: String,
        args_text: String,
        alias: Option<String>,
        original_text: String,
        is_aggregate: bool,
        is_window: bool,
        window_spec: Option<WindowSpec>,
    },
    Case {
        when_clauses: Vec<WhenClause>,
        else_: Option<String>,
        alias: Option<String>,
    },
    RegexpInfix {
        left: String,
        operator: RegexpOp,
        right: String,
        alias: Option<String>,
    },
    Raw {
        text: String,
        alias: Option<String>,
    },
}

impl Column {
    /// The output label a projection should use for this column, matching
    /// spec.md I4's "preserve original SQL text" rule.
    pub fn output_label(&self) -> String {
        match self {
            Column::Star => "*".to_string(),
            Column::Plain { name, alias, .. } => alias.clone().unwrap_or_else(|| name.clone()),
            Column::Function {
                alias,
                original_text,
                ..
            } => alias.clone().unwrap_or_else(|| original_text.clone()),
            Column::Case { alias, .. } => alias.clone().unwrap_or_else(|| "CASE".to_string()),
            Column::RegexpInfix {
                left,
                operator,
                right,
                alias,
            } => alias.clone().unwrap_or_else(|| {
                let op = match operator {
                    RegexpOp::Regexp => "REGEXP",
                    RegexpOp::Rlike => "RLIKE",
                    RegexpOp::NotRegexp => "NOT REGEXP",
                };
                format!("{left} {op} {right}")
            }),
            Column::Raw { text, alias } => alias.clone().unwrap_or_else(|| text.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    Regexp,
    Rlike,
    NotRegexp,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Simple {
        field: String,
        op: CompareOp,
        value: PredicateValue,
    },
    Compound {
        op: BoolOp,
        children: Vec<Predicate>,
    },
}

/// The right-hand side of a `Simple` predicate. `IN`'s value may be a
/// literal list or a subquery (represented by its raw SQL text, resolved
/// into a `Subquery` by the parser's subquery-detection pass).
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Single(Value),
    List(Vec<Value>),
    Between(Value, Value),
    Subquery(String),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinCond {
    pub left_table: String,
    pub left_col: String,
    pub right_table: String,
    pub right_col: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOp {
    pub kind: JoinKind,
    pub left_table: String,
    pub right_table: String,
    pub left_alias: Option<String>,
    pub right_alias: Option<String>,
    pub conditions: Vec<JoinCond>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    Scalar,
    InList,
    Exists,
    Row,
    Derived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub kind: SubqueryKind,
    /// comma-joined for ROW
    pub outer_field: Option<String>,
    pub inner_sql: String,
    pub inner_collection: String,
    pub inner_field: Option<String>,
    pub comparison_op: Option<CompareOp>,
    pub correlation_fields: Vec<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Show,
    Use,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    pub count: i64,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Having {
    Parsed(Predicate),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: StatementKind,
    pub columns: Vec<Column>,
    pub from_table: Option<String>,
    pub from_alias: Option<String>,
    pub joins: Vec<JoinOp>,
    pub where_pred: Option<Predicate>,
    pub group_by: Vec<String>,
    pub having: Option<Having>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Limit>,
    pub distinct: bool,
    pub subqueries: Vec<Subquery>,
    pub original_text: String,
}

impl Query {
    pub fn empty(kind: StatementKind, original_text: impl Into<String>) -> Self {
        Query {
            kind,
            columns: Vec::new(),
            from_table: None,
            from_alias: None,
            joins: Vec::new(),
            where_pred: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            distinct: false,
            subqueries: Vec::new(),
            original_text: original_text.into(),
        }
    }

    pub fn has_aggregate_column(&self) -> bool {
        self.columns.iter().any(|c| {
            matches!(
                c,
                Column::Function {
                    is_aggregate: true,
                    ..
                }
            )
        })
    }
}
