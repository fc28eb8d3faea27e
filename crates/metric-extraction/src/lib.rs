//! Compilation of alert definitions and project thresholds into the rule
//! language of the ingestion pipeline: metric extraction configs, and
//! conditional tagging rules of extracted metrics.

mod alerts;
mod errors;
mod extraction;
mod fields;
mod outliers;
mod satisfaction;
pub mod search;

pub use alerts::{
    convert_alert_to_metric, convert_query_to_condition, query_hash, ON_DEMAND_METRIC_NAME,
    QUERY_HASH_TAG,
};
pub use errors::Error;
pub use extraction::{
    get_extraction_config, MAX_ALERT_METRICS, METRIC_EXTRACTION_VERSION,
    ON_DEMAND_METRICS_CAPABILITY,
};
pub use fields::{translate_aggregate, translate_field, translate_operator};
pub use outliers::{
    histogram_outlier_rules, produce_histogram_outlier_rules, Dimension, FiveNumberSummary,
    StatisticsRow, HISTOGRAM_OUTLIER_TAG,
};
pub use satisfaction::{
    get_conditional_tagging_rules, threshold_to_rules, DEFAULT_THRESHOLD, FRUSTRATION_FACTOR,
    SATISFACTION_TAG, SATISFACTION_TARGET_METRICS,
};
pub use search::SearchResolver;

/// QueryResolver is a delegated trait -- provided to the alert compiler --
/// through which aggregate expressions and filter queries are resolved into
/// the column-level structure of the source dataset.
pub trait QueryResolver: Send + Sync {
    fn resolve_aggregate(&self, aggregate: &str) -> Result<search::Function, Error>;

    fn resolve_conditions(&self, query: &str) -> Result<search::ResolvedConditions, Error>;
}
