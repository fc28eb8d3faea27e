use crate::search::{Op, ParseError};
use serde_json::Value;

#[must_use]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("field {field:?} is not supported for metric extraction")]
    UnsupportedField { field: String },
    #[error("aggregate function {function:?} is not supported for metric extraction")]
    UnsupportedAggregate { function: String },
    #[error("counter aggregate {function} accepts no parameters, but got {count}")]
    CounterParameters { function: String, count: usize },
    #[error("aggregate {function} requires exactly one field parameter, but got {count}")]
    ParameterCount { function: String, count: usize },
    #[error("aggregate {function} requires a field parameter, but got literal {value}")]
    LiteralParameter { function: String, value: Value },
    #[error("operator {op:?} requires a list operand, but got {rhs}")]
    ListOperand { op: Op, rhs: Value },
    #[error("query {query:?} has no conditions")]
    NoConditions { query: String },
    #[error("query {query:?} has {count} aggregate conditions, which are not supported")]
    HavingConditions { query: String, count: usize },
    #[error("query {query:?} has no conditions which can be extracted")]
    EmptyCondition { query: String },
    #[error("expected a five-number summary of finite values, but got {values:?}")]
    MalformedSummary { values: Vec<String> },
    #[error(transparent)]
    Search(#[from] ParseError),
}
