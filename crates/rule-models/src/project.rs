use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Project bundles the already-fetched records of a project which are
/// compiled into its metric extraction config and tagging rules.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Project {
    pub id: u64,
    #[serde(default)]
    pub slug: String,
    /// # Capabilities (feature flags) which are enabled for the project.
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// # Alert rules of the project, in their stored order.
    #[serde(default)]
    pub alert_rules: Vec<AlertRule>,
    /// # Project-wide transaction threshold, if one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_threshold: Option<ProjectThreshold>,
    /// # Per-transaction overrides of the project-wide threshold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threshold_overrides: Vec<ThresholdOverride>,
}

impl Project {
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertRuleStatus {
    Pending,
    Snapshot,
    Disabled,
}

/// AlertRule is a metric alert defined over an aggregate of a filtered query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AlertRule {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub status: AlertRuleStatus,
    /// # Whether the alert uses a filter which the native query layer cannot express.
    /// Only such alerts are compiled into extracted metrics.
    pub is_custom_filter: bool,
    /// # Aggregate of the alert, such as `count()` or `p95(transaction.duration)`.
    pub aggregate_expression: String,
    /// # Search query which filters the alert's events.
    #[serde(default)]
    pub filter_query: String,
}

/// TransactionMetric is the metric which a transaction threshold applies to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionMetric {
    Duration,
    Lcp,
}

/// ProjectThreshold is the project-wide satisfaction threshold.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProjectThreshold {
    pub metric: TransactionMetric,
    /// # Threshold in milliseconds.
    pub threshold: u32,
}

/// ThresholdOverride replaces the project-wide threshold for a single transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ThresholdOverride {
    /// # Name of the transaction.
    pub transaction: String,
    pub metric: TransactionMetric,
    /// # Threshold in milliseconds.
    pub threshold: u32,
}
