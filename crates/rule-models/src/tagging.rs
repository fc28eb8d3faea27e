use super::{Mri, RuleCondition};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// MetricConditionalTaggingRule adds a tag to already-extracted metrics
/// when its condition matches the payload they were extracted from.
///
/// Rules are applied top-down. Once a tag has been set by an earlier rule,
/// later rules targeting the same tag are skipped, so the order of a rule
/// list is significant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MetricConditionalTaggingRule {
    pub condition: RuleCondition,
    /// # Metrics which receive the tag.
    pub target_metrics: Vec<Mri>,
    /// # Name of the tag to set.
    pub target_tag: String,
    /// # Value of the tag to set.
    pub tag_value: String,
}
