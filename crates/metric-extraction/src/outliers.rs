use crate::Error;
use lazy_static::lazy_static;
use rule_models::{MetricConditionalTaggingRule, Mri, RuleCondition};
use serde::{Deserialize, Serialize};

/// Tag which receives whether a transaction is a histogram outlier.
pub const HISTOGRAM_OUTLIER_TAG: &str = "histogram_outlier";

// Multiple of the inter-quartile range above p75, beyond which a value is an outlier.
const FENCE_FACTOR: f64 = 3.0;

// Percentile statistics of transaction durations, grouped by platform and
// operation and ordered by the number of contributing projects.
const STATISTICS_SNAPSHOT: &str = include_str!("outliers.json");

lazy_static! {
    static ref HISTOGRAM_OUTLIER_RULES: Vec<MetricConditionalTaggingRule> =
        match serde_json::from_str::<Vec<StatisticsRow>>(STATISTICS_SNAPSHOT) {
            Ok(rows) => produce_histogram_outlier_rules(&rows),
            Err(error) => {
                tracing::error!(%error, "failed to parse histogram statistics snapshot");
                produce_histogram_outlier_rules(&[])
            }
        };
}

/// Outlier rules of the built-in statistics snapshot, which are computed once.
pub fn histogram_outlier_rules() -> &'static [MetricConditionalTaggingRule] {
    &HISTOGRAM_OUTLIER_RULES
}

/// StatisticsRow holds summaries of the measured dimensions of transactions
/// with a given platform and operation. Summaries are five numbers
/// (min, p25, p50, p75, max) encoded as strings, or empty if there's no data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StatisticsRow {
    pub platform: String,
    pub op: String,
    /// Number of projects which contributed to the statistics.
    #[serde(default)]
    pub projects: u64,
    #[serde(default)]
    pub duration: Vec<String>,
    #[serde(default)]
    pub lcp: Vec<String>,
    #[serde(default)]
    pub fcp: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Duration,
    Lcp,
    Fcp,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Duration, Dimension::Lcp, Dimension::Fcp];

    /// The distribution metric of this dimension.
    pub fn mri(&self) -> &'static str {
        match self {
            Dimension::Duration => "d:transactions/duration@millisecond",
            Dimension::Lcp => "d:transactions/measurements.lcp@millisecond",
            Dimension::Fcp => "d:transactions/measurements.fcp@millisecond",
        }
    }

    fn summary<'r>(&self, row: &'r StatisticsRow) -> &'r [String] {
        match self {
            Dimension::Duration => &row.duration,
            Dimension::Lcp => &row.lcp,
            Dimension::Fcp => &row.fcp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl FiveNumberSummary {
    /// Parse a summary from its string values, returning None if it's empty.
    pub fn parse(values: &[String]) -> Result<Option<Self>, Error> {
        if values.is_empty() {
            return Ok(None);
        }
        let malformed = || Error::MalformedSummary {
            values: values.to_vec(),
        };

        let parsed = values
            .iter()
            .map(|v| v.trim().parse::<f64>().ok().filter(|f| f.is_finite()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(malformed)?;

        match parsed.as_slice() {
            &[min, p25, median, p75, max] => Ok(Some(Self {
                min,
                p25,
                median,
                p75,
                max,
            })),
            _ => Err(malformed()),
        }
    }

    /// Summaries having zero quartiles are produced when there is no data.
    pub fn is_degenerate(&self) -> bool {
        self.p25 == 0.0 && self.p75 == 0.0
    }

    /// Tukey's upper fence, above which values are outliers.
    pub fn upper_fence(&self) -> f64 {
        self.p75 + FENCE_FACTOR * (self.p75 - self.p25).abs()
    }
}

/// Produce outlier tagging rules from per-platform and per-operation statistics.
///
/// Each non-degenerate summary yields a rule which tags matching transactions
/// at or above the summary's upper fence as outliers. Two fallback rules
/// follow: transactions having a duration are inliers, and everything else
/// is an outlier.
pub fn produce_histogram_outlier_rules(
    rows: &[StatisticsRow],
) -> Vec<MetricConditionalTaggingRule> {
    let mut rules = Vec::new();

    for row in rows {
        for dimension in Dimension::ALL {
            let summary = match FiveNumberSummary::parse(dimension.summary(row)) {
                Ok(Some(summary)) if !summary.is_degenerate() => summary,
                Ok(_) => continue,
                Err(error) => {
                    tracing::warn!(
                        platform = %row.platform,
                        op = %row.op,
                        ?dimension,
                        %error,
                        "skipping malformed histogram statistics"
                    );
                    continue;
                }
            };

            rules.push(MetricConditionalTaggingRule {
                condition: RuleCondition::and(vec![
                    RuleCondition::eq("event.contexts.trace.op", row.op.as_str()),
                    RuleCondition::eq("event.platform", row.platform.as_str()),
                    RuleCondition::gte("event.duration", summary.upper_fence()),
                ]),
                target_metrics: vec![Mri::new(dimension.mri())],
                target_tag: HISTOGRAM_OUTLIER_TAG.to_string(),
                tag_value: "outlier".to_string(),
            });
        }
    }

    let all_metrics: Vec<Mri> = Dimension::ALL.iter().map(|d| Mri::new(d.mri())).collect();

    rules.push(MetricConditionalTaggingRule {
        condition: RuleCondition::and(vec![RuleCondition::gte("event.duration", 0)]),
        target_metrics: all_metrics.clone(),
        target_tag: HISTOGRAM_OUTLIER_TAG.to_string(),
        tag_value: "inlier".to_string(),
    });
    rules.push(MetricConditionalTaggingRule {
        condition: RuleCondition::always(),
        target_metrics: all_metrics,
        target_tag: HISTOGRAM_OUTLIER_TAG.to_string(),
        tag_value: "outlier".to_string(),
    });

    rules
}
