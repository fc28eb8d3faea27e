//! Value types of the rule language which the ingestion pipeline evaluates,
//! and of the project records that are compiled into it.

mod condition;
mod metrics;
mod project;
mod tagging;

pub use condition::{
    CompareOp, ComparingCondition, LogicalCondition, LogicalOp, NotCondition, NotOp,
    RuleCondition,
};
pub use metrics::{
    DataCategory, MetricExtractionConfig, MetricSpec, MetricType, Mri, MriParts, TagSpec,
};
pub use project::{
    AlertRule, AlertRuleStatus, Project, ProjectThreshold, ThresholdOverride, TransactionMetric,
};
pub use tagging::MetricConditionalTaggingRule;

pub use validator::Validate;
