use crate::fields::{translate_aggregate, translate_field, translate_operator};
use crate::search::{BooleanOp, Condition, Lhs, WhereCondition};
use crate::{Error, QueryResolver};
use rule_models::{AlertRule, DataCategory, MetricSpec, Mri, RuleCondition, TagSpec};
use xxhash_rust::xxh3::xxh3_64;

/// Namespaced name of metrics which are extracted on behalf of alerts.
pub const ON_DEMAND_METRIC_NAME: &str = "transactions/on-demand";
/// Tag which carries the hash of an alert's query.
pub const QUERY_HASH_TAG: &str = "query_hash";

/// Compile an alert into the MetricSpec which extracts its metric.
///
/// Returns Ok(None) if the alert doesn't use a custom filter, as its metric
/// is then already available without extraction.
pub fn convert_alert_to_metric(
    alert: &AlertRule,
    resolver: &dyn QueryResolver,
) -> Result<Option<MetricSpec>, Error> {
    if !alert.is_custom_filter {
        return Ok(None);
    }
    let query = alert.filter_query.as_str();

    let aggregate = resolver.resolve_aggregate(&alert.aggregate_expression)?;
    let (field, metric_type) = translate_aggregate(&aggregate)?;
    let condition = convert_query_to_condition(query, resolver)?;

    Ok(Some(MetricSpec {
        category: DataCategory::Transaction,
        mri: Mri::build(metric_type, ON_DEMAND_METRIC_NAME, "none"),
        field: field.map(str::to_string),
        condition: Some(condition),
        tags: vec![TagSpec::with_value(QUERY_HASH_TAG, query_hash(field, query))],
    }))
}

/// Compile a filter query into a RuleCondition.
///
/// A query with a single top-level condition compiles to that condition, and
/// multiple top-level conditions are joined with `and`. Conditions over
/// computed (function-valued) fields cannot be extracted and are dropped,
/// but a query which is left with no conditions at all is an error.
pub fn convert_query_to_condition(
    query: &str,
    resolver: &dyn QueryResolver,
) -> Result<RuleCondition, Error> {
    let resolved = resolver.resolve_conditions(query)?;

    if resolved.where_conditions.is_empty() {
        return Err(Error::NoConditions {
            query: query.to_string(),
        });
    }
    if !resolved.having_conditions.is_empty() {
        return Err(Error::HavingConditions {
            query: query.to_string(),
            count: resolved.having_conditions.len(),
        });
    }

    let mut conditions = Vec::with_capacity(resolved.where_conditions.len());
    for condition in &resolved.where_conditions {
        if let Some(condition) = convert_condition(condition)? {
            conditions.push(condition);
        }
    }

    match conditions.len() {
        0 => Err(Error::EmptyCondition {
            query: query.to_string(),
        }),
        1 => Ok(conditions.swap_remove(0)),
        _ => Ok(RuleCondition::and(conditions)),
    }
}

// Convert a resolved condition, returning None if it was dropped.
fn convert_condition(condition: &WhereCondition) -> Result<Option<RuleCondition>, Error> {
    match condition {
        WhereCondition::Condition(Condition { lhs, op, rhs }) => match lhs {
            Lhs::Column(column) => Ok(Some(translate_operator(
                *op,
                translate_field(column)?,
                rhs,
            )?)),
            Lhs::Function(function) => {
                tracing::warn!(
                    function = %function.function,
                    ?op,
                    %rhs,
                    "dropping condition over a computed field, which cannot be extracted",
                );
                Ok(None)
            }
        },
        WhereCondition::Boolean(boolean) => {
            let mut inner = Vec::with_capacity(boolean.conditions.len());
            for condition in &boolean.conditions {
                if let Some(condition) = convert_condition(condition)? {
                    inner.push(condition);
                }
            }

            Ok(match (boolean.op, inner.is_empty()) {
                (_, true) => None,
                (BooleanOp::And, false) => Some(RuleCondition::and(inner)),
                (BooleanOp::Or, false) => Some(RuleCondition::or(inner)),
            })
        }
    }
}

/// Hash of an extracted field and the query it's filtered by, as eight
/// lowercase hexadecimal characters. Metrics of alerts having the same
/// field and query share a hash, regardless of the alerts themselves.
pub fn query_hash(field: Option<&str>, query: &str) -> String {
    let digest = xxh3_64(format!("{};{}", field.unwrap_or_default(), query).as_bytes());
    format!("{:08x}", digest as u32)
}

#[cfg(test)]
mod test {
    use super::{convert_alert_to_metric, convert_query_to_condition, query_hash};
    use crate::search::{
        BooleanCondition, BooleanOp, Condition, Function, Lhs, Op, ResolvedConditions,
        WhereCondition,
    };
    use crate::{Error, QueryResolver, SearchResolver};
    use rule_models::{AlertRule, AlertRuleStatus, RuleCondition};
    use serde_json::json;

    fn alert(aggregate: &str, query: &str) -> AlertRule {
        AlertRule {
            id: 1,
            name: "test alert".to_string(),
            status: AlertRuleStatus::Pending,
            is_custom_filter: true,
            aggregate_expression: aggregate.to_string(),
            filter_query: query.to_string(),
        }
    }

    #[test]
    fn test_counter_alert() {
        let spec = convert_alert_to_metric(&alert("count()", "release:1.0"), &SearchResolver)
            .unwrap()
            .unwrap();
        let hash = query_hash(None, "release:1.0");

        insta::assert_json_snapshot!(spec, {".tags[0].value" => "[hash]"}, @r###"
        {
          "category": "transaction",
          "mri": "c:transactions/on-demand@none",
          "field": null,
          "condition": {
            "op": "eq",
            "name": "event.release",
            "value": "1.0"
          },
          "tags": [
            {
              "key": "query_hash",
              "value": "[hash]"
            }
          ]
        }
        "###);
        assert_eq!(spec.tags[0].value.as_deref(), Some(hash.as_str()));
    }

    #[test]
    fn test_distribution_alert() {
        let spec = convert_alert_to_metric(
            &alert(
                "p95(measurements.lcp)",
                "transaction.op:pageload (release:1.* OR !geo.country_code:[US, CA])",
            ),
            &SearchResolver,
        )
        .unwrap()
        .unwrap();

        assert_eq!(spec.mri.as_str(), "d:transactions/on-demand@none");
        assert_eq!(spec.field.as_deref(), Some("event.measurements.lcp"));
        assert_eq!(
            serde_json::to_value(&spec.condition).unwrap(),
            json!({
                "op": "and",
                "inner": [
                    {"op": "eq", "name": "event.transaction.op", "value": "pageload"},
                    {"op": "or", "inner": [
                        {"op": "glob", "name": "event.release", "value": "1.*"},
                        {"op": "not", "inner": {"op": "or", "inner": [
                            {"op": "eq", "name": "event.geo.country_code", "value": "US"},
                            {"op": "eq", "name": "event.geo.country_code", "value": "CA"},
                        ]}},
                    ]},
                ],
            })
        );
        assert_eq!(
            spec.tags[0].value.as_deref(),
            Some(
                query_hash(
                    Some("event.measurements.lcp"),
                    "transaction.op:pageload (release:1.* OR !geo.country_code:[US, CA])"
                )
                .as_str()
            )
        );
    }

    #[test]
    fn test_non_custom_alerts_are_skipped() {
        let mut alert = alert("count()", "release:1.0");
        alert.is_custom_filter = false;

        assert!(convert_alert_to_metric(&alert, &SearchResolver)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_rejected_alerts() {
        for (aggregate, query) in [
            ("count()", ""),
            ("count()", "environment:prod"),
            ("count()", "release:1.0 count():>10"),
            ("apdex(300)", "release:1.0"),
            ("avg(transaction.duration, 1)", "release:1.0"),
            ("count()", "release:"),
            ("count()", "os.name:Windows"),
        ] {
            convert_alert_to_metric(&alert(aggregate, query), &SearchResolver).unwrap_err();
        }
    }

    #[test]
    fn test_query_conditions() {
        let cond = |query| convert_query_to_condition(query, &SearchResolver);

        assert_eq!(
            cond("transaction.duration:>=1s http.method:POST").unwrap(),
            RuleCondition::and(vec![
                RuleCondition::gte("event.duration", 1000),
                RuleCondition::eq("event.http.method", "POST"),
            ])
        );
        assert!(matches!(cond(""), Err(Error::NoConditions { .. })));
        assert!(matches!(
            cond("release:1.0 count():>10"),
            Err(Error::HavingConditions { count: 1, .. })
        ));
        assert!(matches!(
            cond("transaction_foo:bar"),
            Err(Error::UnsupportedField { field }) if field == "tags[transaction_foo]"
        ));
        assert!(matches!(cond("release:\"1.0"), Err(Error::Search(_))));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_function_conditions_are_dropped() {
        let cond = |query| convert_query_to_condition(query, &SearchResolver);

        // The computed `os.name` condition is dropped, and the remaining
        // single condition is returned without a wrapping `and`.
        assert_eq!(
            cond("os.name:Windows release:1.0").unwrap(),
            RuleCondition::eq("event.release", "1.0")
        );
        assert!(logs_contain("dropping condition over a computed field"));

        // Boolean groups which are emptied are dropped as well.
        assert_eq!(
            cond("release:1.0 (os.name:Windows OR browser.name:Firefox)").unwrap(),
            RuleCondition::eq("event.release", "1.0")
        );
        assert!(matches!(
            cond("http.status_code:500"),
            Err(Error::EmptyCondition { .. })
        ));
    }

    #[test]
    fn test_delegated_resolver() {
        // Resolvers may produce structures which aren't expressible as query
        // text, such as boolean conditions with a single child.
        struct Fixed;

        impl QueryResolver for Fixed {
            fn resolve_aggregate(&self, _aggregate: &str) -> Result<Function, Error> {
                Ok(Function {
                    function: "count".to_string(),
                    parameters: Vec::new(),
                })
            }
            fn resolve_conditions(&self, _query: &str) -> Result<ResolvedConditions, Error> {
                Ok(ResolvedConditions {
                    where_conditions: vec![WhereCondition::Boolean(BooleanCondition {
                        op: BooleanOp::Or,
                        conditions: vec![WhereCondition::Condition(Condition {
                            lhs: Lhs::column("duration"),
                            op: Op::Lt,
                            rhs: json!(10),
                        })],
                    })],
                    having_conditions: Vec::new(),
                })
            }
        }

        let spec = convert_alert_to_metric(&alert("anything", "anything"), &Fixed)
            .unwrap()
            .unwrap();
        assert_eq!(
            spec.condition,
            Some(RuleCondition::or(vec![RuleCondition::lt("event.duration", 10)]))
        );
    }

    #[test]
    fn test_query_hash() {
        let hash = query_hash(Some("event.duration"), "release:1.0");

        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_eq!(hash, query_hash(Some("event.duration"), "release:1.0"));

        assert_ne!(hash, query_hash(Some("event.duration"), "release:1.1"));
        assert_ne!(hash, query_hash(Some("event.measurements.lcp"), "release:1.0"));
        assert_ne!(hash, query_hash(None, "release:1.0"));
    }
}
