use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RuleCondition is a boolean condition which is evaluated against an event
/// payload by the ingestion pipeline. Conditions form a finite tree of
/// comparisons joined by logical operators and negations.
///
/// Each variant serializes as a flat JSON object discriminated by its `op`:
///
/// ```json
/// {"op": "eq", "name": "event.release", "value": "1.0"}
/// {"op": "and", "inner": [...]}
/// {"op": "not", "inner": {...}}
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum RuleCondition {
    Comparing(ComparingCondition),
    Logical(LogicalCondition),
    Not(NotCondition),
}

/// ComparingCondition compares a named payload field to a literal value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ComparingCondition {
    pub op: CompareOp,
    /// # Dotted path of the payload field, such as `event.duration`.
    pub name: String,
    /// # Literal value which the field is compared to.
    pub value: Value,
}

/// LogicalCondition applies a logical operator to an ordered sequence of conditions.
/// An `and` with no inner conditions always matches, and an `or` with no
/// inner conditions never matches.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LogicalCondition {
    pub op: LogicalOp,
    pub inner: Vec<RuleCondition>,
}

/// NotCondition negates its inner condition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NotCondition {
    pub op: NotOp,
    pub inner: Box<RuleCondition>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Glob,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotOp {
    Not,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Glob => "glob",
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RuleCondition {
    pub fn compare(op: CompareOp, name: impl Into<String>, value: impl Into<Value>) -> Self {
        RuleCondition::Comparing(ComparingCondition {
            op,
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Eq, name, value)
    }

    pub fn gt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Gt, name, value)
    }

    pub fn gte(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Gte, name, value)
    }

    pub fn lt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Lt, name, value)
    }

    pub fn lte(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Lte, name, value)
    }

    pub fn glob(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Glob, name, value)
    }

    pub fn and(inner: Vec<RuleCondition>) -> Self {
        RuleCondition::Logical(LogicalCondition {
            op: LogicalOp::And,
            inner,
        })
    }

    pub fn or(inner: Vec<RuleCondition>) -> Self {
        RuleCondition::Logical(LogicalCondition {
            op: LogicalOp::Or,
            inner,
        })
    }

    pub fn negate(inner: RuleCondition) -> Self {
        RuleCondition::Not(NotCondition {
            op: NotOp::Not,
            inner: Box::new(inner),
        })
    }

    /// An `and` condition without any inner conditions, which matches every payload.
    pub fn always() -> Self {
        Self::and(Vec::new())
    }

    /// Visit every comparison of this condition tree, in depth-first order.
    pub fn comparisons(&self) -> Vec<&ComparingCondition> {
        let mut out = Vec::new();
        self.walk_comparisons(&mut out);
        out
    }

    fn walk_comparisons<'a>(&'a self, out: &mut Vec<&'a ComparingCondition>) {
        match self {
            RuleCondition::Comparing(c) => out.push(c),
            RuleCondition::Logical(l) => l.inner.iter().for_each(|c| c.walk_comparisons(out)),
            RuleCondition::Not(n) => n.inner.walk_comparisons(out),
        }
    }
}
