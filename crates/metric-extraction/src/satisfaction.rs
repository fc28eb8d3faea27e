use crate::histogram_outlier_rules;
use itertools::Itertools;
use rule_models::{
    MetricConditionalTaggingRule, Mri, Project, ProjectThreshold, RuleCondition,
    TransactionMetric,
};

/// Tag which receives the satisfaction of a transaction.
pub const SATISFACTION_TAG: &str = "satisfaction";
/// Metrics which are tagged with the satisfaction of their transaction.
pub const SATISFACTION_TARGET_METRICS: [&str; 3] = [
    "s:transactions/user@none",
    "d:transactions/duration@millisecond",
    "d:transactions/measurements.lcp@millisecond",
];
/// A transaction is frustrated once it exceeds this multiple of its threshold.
pub const FRUSTRATION_FACTOR: u64 = 4;
/// Threshold of projects which haven't configured one.
pub const DEFAULT_THRESHOLD: ProjectThreshold = ProjectThreshold {
    metric: TransactionMetric::Duration,
    threshold: 300,
};

fn rule_field(metric: TransactionMetric) -> &'static str {
    match metric {
        TransactionMetric::Duration => "event.duration",
        TransactionMetric::Lcp => "event.measurements.lcp.value",
    }
}

/// Build the ordered conditional tagging rules of a project.
///
/// Rules of transaction-specific threshold overrides come first, ordered by
/// transaction name, followed by rules of the project-wide threshold (or the
/// default threshold), and finally the histogram outlier rules. As the
/// first matching rule of a tag wins, this order is significant.
#[tracing::instrument(skip_all, fields(project_id = project.id))]
pub fn get_conditional_tagging_rules(project: &Project) -> Vec<MetricConditionalTaggingRule> {
    let mut rules = Vec::new();

    for threshold in project
        .threshold_overrides
        .iter()
        .sorted_by(|l, r| l.transaction.cmp(&r.transaction))
    {
        rules.extend(threshold_to_rules(
            threshold.metric,
            threshold.threshold,
            vec![RuleCondition::eq(
                "event.transaction",
                threshold.transaction.as_str(),
            )],
        ));
    }

    // Fallback for transactions which don't have an override.
    let fallback = project.transaction_threshold.unwrap_or(DEFAULT_THRESHOLD);
    rules.extend(threshold_to_rules(fallback.metric, fallback.threshold, Vec::new()));

    rules.extend_from_slice(histogram_outlier_rules());

    tracing::debug!(
        overrides = project.threshold_overrides.len(),
        rules = rules.len(),
        "built conditional tagging rules"
    );
    rules
}

/// Build the frustrated, tolerated, and satisfied rules of a threshold, in
/// that order, each of which also requires `extra` conditions.
///
/// ```text
/// if value > 4 * threshold { frustrated }
/// else if value > threshold { tolerated }
/// else { satisfied }
/// ```
pub fn threshold_to_rules(
    metric: TransactionMetric,
    threshold: u32,
    extra: Vec<RuleCondition>,
) -> [MetricConditionalTaggingRule; 3] {
    let field = rule_field(metric);
    let threshold = u64::from(threshold);

    let rule = |comparison: Option<RuleCondition>, tag_value: &str| {
        let inner = comparison.into_iter().chain(extra.iter().cloned()).collect();

        MetricConditionalTaggingRule {
            condition: RuleCondition::and(inner),
            target_metrics: SATISFACTION_TARGET_METRICS.iter().map(|m| Mri::new(*m)).collect(),
            target_tag: SATISFACTION_TAG.to_string(),
            tag_value: tag_value.to_string(),
        }
    };

    [
        rule(
            Some(RuleCondition::gt(field, threshold * FRUSTRATION_FACTOR)),
            "frustrated",
        ),
        rule(Some(RuleCondition::gt(field, threshold)), "tolerated"),
        rule(None, "satisfied"),
    ]
}
