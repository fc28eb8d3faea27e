use crate::search::{Function, Op, Parameter};
use crate::Error;
use rule_models::{MetricType, RuleCondition};
use serde_json::Value;

// Columns of the transactions dataset, and the payload fields they're read from.
// browser.name, os.name, and http.status_code are computed through functions
// and cannot be mapped.
const FIELD_MAPPING: &[(&str, &str)] = &[
    ("contexts[geo.country_code]", "event.geo.country_code"),
    ("http_method", "event.http.method"),
    ("release", "event.release"),
    ("transaction_op", "event.transaction.op"),
    ("transaction_status", "event.transaction.status"),
    ("duration", "event.duration"),
    ("measurements[cls]", "event.measurements.cls"),
    ("measurements[fcp]", "event.measurements.fcp"),
    ("measurements[fid]", "event.measurements.fid"),
    ("measurements[fp]", "event.measurements.fp"),
    ("measurements[lcp]", "event.measurements.lcp"),
    ("measurements[ttfb]", "event.measurements.ttfb"),
    ("measurements[ttfb.requesttime]", "event.measurements.ttfb.requesttime"),
];

// Aggregate functions, and the type of metric which is extracted for them.
// Functions mapped to None are recognized but cannot be extracted.
const AGGREGATE_METRIC_TYPES: &[(&str, Option<MetricType>)] = &[
    ("count", Some(MetricType::Counter)),
    ("avg", Some(MetricType::Distribution)),
    ("quantile(0.50)", Some(MetricType::Distribution)),
    ("quantile(0.75)", Some(MetricType::Distribution)),
    ("quantile(0.95)", Some(MetricType::Distribution)),
    ("quantile(0.99)", Some(MetricType::Distribution)),
    ("max", Some(MetricType::Distribution)),
    ("percentile", None),
    ("failure_rate", None),
    ("apdex", None),
];

/// Translate a dataset column into the payload field of the rule language.
/// Unknown columns are an error.
pub fn translate_field(column: &str) -> Result<&'static str, Error> {
    FIELD_MAPPING
        .iter()
        .find(|(from, _)| *from == column)
        .map(|(_, to)| *to)
        .ok_or_else(|| Error::UnsupportedField {
            field: column.to_string(),
        })
}

/// Translate a resolved aggregate into the payload field which its metric
/// reads, and the type of the metric.
///
/// Counters read no field and must not have parameters. All other aggregates
/// must have exactly one parameter, which is a translatable column.
pub fn translate_aggregate(
    aggregate: &Function,
) -> Result<(Option<&'static str>, MetricType), Error> {
    let metric_type = AGGREGATE_METRIC_TYPES
        .iter()
        .find(|(function, _)| *function == aggregate.function)
        .and_then(|(_, metric_type)| *metric_type)
        .ok_or_else(|| Error::UnsupportedAggregate {
            function: aggregate.function.clone(),
        })?;

    if metric_type == MetricType::Counter {
        if !aggregate.parameters.is_empty() {
            return Err(Error::CounterParameters {
                function: aggregate.function.clone(),
                count: aggregate.parameters.len(),
            });
        }
        return Ok((None, metric_type));
    }

    match aggregate.parameters.as_slice() {
        [Parameter::Column(column)] => Ok((Some(translate_field(column)?), metric_type)),
        [Parameter::Literal(value)] => Err(Error::LiteralParameter {
            function: aggregate.function.clone(),
            value: value.clone(),
        }),
        parameters => Err(Error::ParameterCount {
            function: aggregate.function.clone(),
            count: parameters.len(),
        }),
    }
}

/// Translate a comparison of payload field `name` into a RuleCondition.
/// Operators which have no direct counterpart are expressed through `not`
/// and `or`.
pub fn translate_operator(op: Op, name: &str, rhs: &Value) -> Result<RuleCondition, Error> {
    let any_of = || match rhs {
        Value::Array(items) => Ok(RuleCondition::or(
            items
                .iter()
                .map(|item| RuleCondition::eq(name, item.clone()))
                .collect(),
        )),
        _ => Err(Error::ListOperand {
            op,
            rhs: rhs.clone(),
        }),
    };

    Ok(match op {
        Op::Eq => RuleCondition::eq(name, rhs.clone()),
        Op::Gt => RuleCondition::gt(name, rhs.clone()),
        Op::Gte => RuleCondition::gte(name, rhs.clone()),
        Op::Lt => RuleCondition::lt(name, rhs.clone()),
        Op::Lte => RuleCondition::lte(name, rhs.clone()),
        Op::Like => RuleCondition::glob(name, rhs.clone()),
        Op::Neq => RuleCondition::negate(RuleCondition::eq(name, rhs.clone())),
        Op::NotLike => RuleCondition::negate(RuleCondition::glob(name, rhs.clone())),
        Op::In => any_of()?,
        Op::NotIn => RuleCondition::negate(any_of()?),
    })
}

#[cfg(test)]
mod test {
    use super::{translate_aggregate, translate_field, translate_operator, FIELD_MAPPING};
    use crate::search::{resolve_aggregate, Function, Op, Parameter};
    use crate::Error;
    use rule_models::{MetricType, RuleCondition};
    use serde_json::json;

    #[test]
    fn test_field_translation() {
        assert_eq!(translate_field("release").unwrap(), "event.release");
        assert_eq!(
            translate_field("measurements[ttfb.requesttime]").unwrap(),
            "event.measurements.ttfb.requesttime"
        );

        for column in ["environment", "tags[custom]", "measurements[inp]", ""] {
            assert!(matches!(
                translate_field(column),
                Err(Error::UnsupportedField { field }) if field == column
            ));
        }
    }

    #[test]
    fn test_supported_aggregates_over_every_field() {
        // Resolving then translating any supported aggregate over any mapped
        // column yields its payload field and a distribution.
        for function in ["avg", "max", "p50", "p75", "p95", "p99"] {
            for (column, field) in FIELD_MAPPING {
                let aggregate = Function {
                    function: resolve_aggregate(&format!("{function}()"))
                        .unwrap()
                        .function,
                    parameters: vec![Parameter::Column(column.to_string())],
                };
                assert_eq!(
                    translate_aggregate(&aggregate).unwrap(),
                    (Some(*field), MetricType::Distribution),
                    "{function} over {column}"
                );
            }
        }

        let count = resolve_aggregate("count()").unwrap();
        assert_eq!(
            translate_aggregate(&count).unwrap(),
            (None, MetricType::Counter)
        );
    }

    #[test]
    fn test_rejected_aggregates() {
        let cases = [
            ("count(transaction.duration)", "CounterParameters"),
            ("percentile(transaction.duration, 0.95)", "UnsupportedAggregate"),
            ("failure_rate()", "UnsupportedAggregate"),
            ("apdex(300)", "UnsupportedAggregate"),
            ("count_unique(user)", "UnsupportedAggregate"),
            ("sum(transaction.duration)", "UnsupportedAggregate"),
            ("avg(browser)", "UnsupportedField"),
            ("max(1)", "LiteralParameter"),
            ("max()", "ParameterCount"),
        ];

        for (aggregate, expect) in cases {
            let err = translate_aggregate(&resolve_aggregate(aggregate).unwrap()).unwrap_err();
            let actual = match err {
                Error::CounterParameters { .. } => "CounterParameters",
                Error::UnsupportedAggregate { .. } => "UnsupportedAggregate",
                Error::UnsupportedField { .. } => "UnsupportedField",
                Error::LiteralParameter { .. } => "LiteralParameter",
                Error::ParameterCount { .. } => "ParameterCount",
                other => panic!("unexpected error {other:?}"),
            };
            assert_eq!(actual, expect, "aggregate {aggregate:?}");
        }
    }

    #[test]
    fn test_operator_translation() {
        let name = "event.transaction.op";

        for (op, rhs, expect) in [
            (Op::Eq, json!("a"), RuleCondition::eq(name, "a")),
            (Op::Gt, json!(1), RuleCondition::gt(name, 1)),
            (Op::Gte, json!(1), RuleCondition::gte(name, 1)),
            (Op::Lt, json!(1), RuleCondition::lt(name, 1)),
            (Op::Lte, json!(1), RuleCondition::lte(name, 1)),
            (Op::Like, json!("a*"), RuleCondition::glob(name, "a*")),
            (
                Op::Neq,
                json!("a"),
                RuleCondition::negate(RuleCondition::eq(name, "a")),
            ),
            (
                Op::NotLike,
                json!("a*"),
                RuleCondition::negate(RuleCondition::glob(name, "a*")),
            ),
            (
                Op::In,
                json!(["a", "b"]),
                RuleCondition::or(vec![RuleCondition::eq(name, "a"), RuleCondition::eq(name, "b")]),
            ),
            (
                Op::NotIn,
                json!(["a"]),
                RuleCondition::negate(RuleCondition::or(vec![RuleCondition::eq(name, "a")])),
            ),
        ] {
            assert_eq!(translate_operator(op, name, &rhs).unwrap(), expect, "op {op:?}");
        }

        assert!(matches!(
            translate_operator(Op::In, name, &json!("a")),
            Err(Error::ListOperand { op: Op::In, .. })
        ));
    }
}
