use super::{
    parse_query, BooleanCondition, BooleanOp, Comparator, Condition, FilterValue, Function, Lhs,
    Op, Parameter, ParseError, ResolvedConditions, SearchExpr, SearchFilter, WhereCondition,
};
use serde_json::Value;

/// SearchResolver resolves queries and aggregates against the column
/// layout of the transactions dataset.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchResolver;

impl crate::QueryResolver for SearchResolver {
    fn resolve_aggregate(&self, aggregate: &str) -> Result<Function, crate::Error> {
        Ok(resolve_aggregate(aggregate)?)
    }

    fn resolve_conditions(&self, query: &str) -> Result<ResolvedConditions, crate::Error> {
        Ok(resolve_conditions(query)?)
    }
}

// Kind of values which a search key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Text,
    Number,
    Duration,
}

/// Parse and resolve a search query into its `where` and `having` conditions.
///
/// Filters over aggregates (`count():>10`) are hoisted into `having`, and must
/// appear at the top level of the query.
pub fn resolve_conditions(query: &str) -> Result<ResolvedConditions, ParseError> {
    let terms = match parse_query(query)? {
        SearchExpr::And(terms) => terms,
        expr => vec![expr],
    };
    let mut resolved = ResolvedConditions::default();

    for term in terms {
        match term {
            SearchExpr::Filter(filter) if is_aggregate_key(&filter.key) => {
                resolved.having_conditions.push(resolve_having(&filter)?);
            }
            expr => resolved.where_conditions.push(resolve_expr(&expr)?),
        }
    }
    Ok(resolved)
}

/// Resolve an aggregate expression such as `p95(transaction.duration)`.
pub fn resolve_aggregate(aggregate: &str) -> Result<Function, ParseError> {
    resolve_function(aggregate).map(|(function, _kind)| function)
}

fn resolve_expr(expr: &SearchExpr) -> Result<WhereCondition, ParseError> {
    let (op, exprs) = match expr {
        SearchExpr::Filter(filter) if is_aggregate_key(&filter.key) => {
            return Err(ParseError::NestedAggregate {
                key: filter.key.clone(),
            })
        }
        SearchExpr::Filter(filter) => return Ok(WhereCondition::Condition(resolve_filter(filter)?)),
        SearchExpr::And(exprs) => (BooleanOp::And, exprs),
        SearchExpr::Or(exprs) => (BooleanOp::Or, exprs),
    };

    Ok(WhereCondition::Boolean(BooleanCondition {
        op,
        conditions: exprs.iter().map(resolve_expr).collect::<Result<_, _>>()?,
    }))
}

fn resolve_filter(filter: &SearchFilter) -> Result<Condition, ParseError> {
    let (lhs, kind) = resolve_key(&filter.key);
    let (op, rhs) = resolve_value(filter, kind)?;
    Ok(Condition { lhs, op, rhs })
}

fn resolve_having(filter: &SearchFilter) -> Result<Condition, ParseError> {
    let (function, kind) = resolve_function(&filter.key)?;

    if let FilterValue::List(_) = filter.value {
        return Err(ParseError::InvalidList {
            key: filter.key.clone(),
        });
    }
    let (op, rhs) = resolve_value(filter, kind)?;

    Ok(Condition {
        lhs: Lhs::Function(function),
        op,
        rhs,
    })
}

fn is_aggregate_key(key: &str) -> bool {
    key.contains('(')
}

// Map a search key onto the dataset. Keys which aren't known columns are
// treated as tags.
fn resolve_key(key: &str) -> (Lhs, KeyKind) {
    let column = |name: &str, kind| (Lhs::column(name), kind);
    let context = |function: &str, column: &str, trailing: Option<Value>| {
        let mut parameters = vec![Parameter::Column(column.to_string())];
        parameters.extend(trailing.map(Parameter::Literal));

        Lhs::Function(Function {
            function: function.to_string(),
            parameters,
        })
    };

    match key {
        "release" | "environment" | "transaction" | "platform" | "user" => {
            column(key, KeyKind::Text)
        }
        "transaction.op" => column("transaction_op", KeyKind::Text),
        "transaction.status" => column("transaction_status", KeyKind::Text),
        "http.method" => column("http_method", KeyKind::Text),
        "geo.country_code" => column("contexts[geo.country_code]", KeyKind::Text),
        "transaction.duration" => column("duration", KeyKind::Duration),
        "measurements.cls" => column("measurements[cls]", KeyKind::Number),
        "browser.name" => (
            context("ifNull", "contexts[browser.name]", Some(Value::from(""))),
            KeyKind::Text,
        ),
        "os.name" => (
            context("ifNull", "contexts[os.name]", Some(Value::from(""))),
            KeyKind::Text,
        ),
        "http.status_code" => (
            context("toUInt16OrZero", "contexts[response.status_code]", None),
            KeyKind::Number,
        ),
        _ => {
            if let Some(name) = key.strip_prefix("measurements.") {
                column(&format!("measurements[{name}]"), KeyKind::Duration)
            } else if key.starts_with("tags[") && key.ends_with(']') {
                column(key, KeyKind::Text)
            } else {
                column(&format!("tags[{key}]"), KeyKind::Text)
            }
        }
    }
}

fn resolve_value(filter: &SearchFilter, kind: KeyKind) -> Result<(Op, Value), ParseError> {
    let key = &filter.key;

    let (op, rhs) = match (&filter.value, kind) {
        (FilterValue::List(items), _) => {
            if filter.comparator != Comparator::Eq {
                return Err(ParseError::InvalidList { key: key.clone() });
            }
            let items = items
                .iter()
                .map(|item| typed_value(key, item, kind))
                .collect::<Result<Vec<_>, _>>()?;

            (Op::In, Value::Array(items))
        }
        (FilterValue::Text(text), KeyKind::Text) => {
            if filter.comparator != Comparator::Eq {
                return Err(ParseError::InvalidComparator {
                    key: key.clone(),
                    comparator: filter.comparator,
                });
            }
            let op = if text.contains('*') { Op::Like } else { Op::Eq };
            (op, Value::String(text.clone()))
        }
        (FilterValue::Text(text), _) => {
            let op = match filter.comparator {
                Comparator::Eq => Op::Eq,
                Comparator::Gt => Op::Gt,
                Comparator::Gte => Op::Gte,
                Comparator::Lt => Op::Lt,
                Comparator::Lte => Op::Lte,
            };
            (op, typed_value(key, text, kind)?)
        }
    };

    Ok(if filter.negated {
        (op.negated(), rhs)
    } else {
        (op, rhs)
    })
}

fn typed_value(key: &str, value: &str, kind: KeyKind) -> Result<Value, ParseError> {
    match kind {
        KeyKind::Text => Ok(Value::String(value.to_string())),
        KeyKind::Number => parse_number(value).ok_or_else(|| ParseError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        }),
        KeyKind::Duration => parse_duration(value).ok_or_else(|| ParseError::InvalidDuration {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number(value: &str) -> Option<Value> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(Value::from(n));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

// Parse a duration into milliseconds. Bare numbers are already milliseconds.
fn parse_duration(value: &str) -> Option<Value> {
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);

    let factor = match unit {
        "" | "ms" => 1.0,
        "s" => 1_000.0,
        "m" | "min" => 60_000.0,
        "h" | "hr" => 3_600_000.0,
        "d" | "day" => 86_400_000.0,
        "w" | "wk" => 604_800_000.0,
        _ => return None,
    };
    let amount: f64 = amount.parse().ok()?;
    let millis = amount * factor;

    if !millis.is_finite() {
        None
    } else if millis.fract() == 0.0 && millis.abs() < i64::MAX as f64 {
        Some(Value::from(millis as i64))
    } else {
        serde_json::Number::from_f64(millis).map(Value::Number)
    }
}

// Resolve an aggregate into its function, and the kind of values it produces.
fn resolve_function(aggregate: &str) -> Result<(Function, KeyKind), ParseError> {
    let malformed = || ParseError::MalformedAggregate {
        aggregate: aggregate.to_string(),
    };

    let (name, args) = aggregate
        .trim()
        .strip_suffix(')')
        .and_then(|s| s.split_once('('))
        .ok_or_else(malformed)?;

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(malformed());
    }
    let args: Vec<&str> = if args.trim().is_empty() {
        Vec::new()
    } else {
        args.split(',').map(str::trim).collect()
    };
    if args.iter().any(|arg| arg.is_empty()) {
        return Err(malformed());
    }

    let (function, args) = match name {
        "p50" | "p75" | "p95" | "p99" if args.len() <= 1 => {
            let function = format!("quantile(0.{})", &name[1..]);
            let args = if args.is_empty() {
                vec!["transaction.duration"]
            } else {
                args
            };
            (function, args)
        }
        "p50" | "p75" | "p95" | "p99" => return Err(malformed()),
        "count_unique" => ("uniq".to_string(), args),
        "count" | "avg" | "max" | "min" | "sum" | "percentile" | "failure_rate" | "apdex" => {
            (name.to_string(), args)
        }
        _ => {
            return Err(ParseError::UnknownFunction {
                function: name.to_string(),
            })
        }
    };

    let mut kind = match name {
        "count" | "count_unique" | "failure_rate" | "apdex" => Some(KeyKind::Number),
        _ => None,
    };
    let mut parameters = Vec::with_capacity(args.len());

    for arg in args {
        if let Some(literal) = parse_number(arg) {
            parameters.push(Parameter::Literal(literal));
            continue;
        }
        match resolve_key(arg) {
            (Lhs::Column(column), arg_kind) => {
                kind.get_or_insert(arg_kind);
                parameters.push(Parameter::Column(column));
            }
            (Lhs::Function(_), _) => return Err(malformed()),
        }
    }

    Ok((
        Function {
            function,
            parameters,
        },
        kind.unwrap_or(KeyKind::Number),
    ))
}
