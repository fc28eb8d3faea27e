use crate::{convert_alert_to_metric, QueryResolver};
use rule_models::{AlertRuleStatus, MetricExtractionConfig, Project};

/// Capability which enables metric extraction for a project.
pub const ON_DEMAND_METRICS_CAPABILITY: &str = "on-demand-metrics-extraction";
/// Version of the MetricExtractionConfig format. Bump on incompatible changes.
pub const METRIC_EXTRACTION_VERSION: u16 = 1;
/// Maximum number of alert metrics which are extracted for a single project.
pub const MAX_ALERT_METRICS: usize = 100;

/// Build the MetricExtractionConfig of a project from its pending alerts.
///
/// Returns None if extraction isn't enabled for the project, or if none of its
/// alerts require extraction. Alerts which fail to compile are logged and
/// skipped without affecting others. Metrics beyond MAX_ALERT_METRICS are
/// dropped, in the order of alerts.
#[tracing::instrument(skip_all, fields(project_id = project.id))]
pub fn get_extraction_config(
    project: &Project,
    resolver: &dyn QueryResolver,
) -> Option<MetricExtractionConfig> {
    if !project.has_capability(ON_DEMAND_METRICS_CAPABILITY) {
        return None;
    }

    let mut metrics = Vec::new();

    for alert in project
        .alert_rules
        .iter()
        .filter(|alert| alert.status == AlertRuleStatus::Pending)
    {
        match convert_alert_to_metric(alert, resolver) {
            Ok(Some(metric)) => metrics.push(metric),
            Ok(None) => (),
            Err(error) => {
                tracing::error!(
                    alert_id = alert.id,
                    aggregate = %alert.aggregate_expression,
                    query = %alert.filter_query,
                    %error,
                    "failed to compile alert into an extracted metric",
                );
            }
        }
    }

    if metrics.is_empty() {
        return None;
    }
    if metrics.len() > MAX_ALERT_METRICS {
        tracing::error!(
            count = metrics.len(),
            max = MAX_ALERT_METRICS,
            "too many alert metrics for project; truncating",
        );
        metrics.truncate(MAX_ALERT_METRICS);
    }

    Some(MetricExtractionConfig {
        version: METRIC_EXTRACTION_VERSION,
        metrics,
    })
}
