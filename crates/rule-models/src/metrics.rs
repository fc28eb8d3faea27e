use super::RuleCondition;
use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::{Validate, ValidationError, ValidationErrors};

lazy_static! {
    // MRI_RE matches a metric reference identifier `<type>:<namespace>/<name>@<unit>`.
    // Names may themselves contain dots and slashes, but never '@'.
    static ref MRI_RE: Regex =
        Regex::new(r"^([a-z]):([A-Za-z_]+)/([^@/][^@]*)@([A-Za-z_.]+)$").unwrap();
}

/// Type of an extracted metric, which is the leading component of its MRI.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
pub enum MetricType {
    /// Counts occurrences of matching payloads. Counters have no value field.
    #[serde(rename = "c")]
    Counter,
    /// Records a numeric value read from the payload.
    #[serde(rename = "d")]
    Distribution,
    /// Records unique string values read from the payload.
    #[serde(rename = "s")]
    Set,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "c",
            MetricType::Distribution => "d",
            MetricType::Set => "s",
        }
    }

    pub fn from_str(s: &str) -> Option<MetricType> {
        match s {
            "c" => Some(MetricType::Counter),
            "d" => Some(MetricType::Distribution),
            "s" => Some(MetricType::Set),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mri is a metric reference identifier of the form `<type>:<namespace>/<name>@<unit>`,
/// such as `d:transactions/duration@millisecond`.
#[derive(
    Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
pub struct Mri(String);

/// Components of a well-formed Mri.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MriParts<'a> {
    pub metric_type: MetricType,
    pub namespace: &'a str,
    pub name: &'a str,
    pub unit: &'a str,
}

impl Mri {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Build an Mri from its `namespace/name` and unit components.
    pub fn build(metric_type: MetricType, namespaced_name: &str, unit: &str) -> Self {
        Self(format!("{metric_type}:{namespaced_name}@{unit}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split this Mri into its components, or None if it's malformed.
    pub fn parts(&self) -> Option<MriParts<'_>> {
        let caps = MRI_RE.captures(&self.0)?;

        Some(MriParts {
            metric_type: MetricType::from_str(caps.get(1)?.as_str())?,
            namespace: caps.get(2)?.as_str(),
            name: caps.get(3)?.as_str(),
            unit: caps.get(4)?.as_str(),
        })
    }

    pub fn metric_type(&self) -> Option<MetricType> {
        self.parts().map(|p| p.metric_type)
    }
}

impl std::ops::Deref for Mri {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Mri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Validate for Mri {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.parts().is_some() {
            return Ok(());
        }
        let mut err = ValidationError::new("mri");
        err.message = Some("expected an MRI of the form <type>:<namespace>/<name>@<unit>".into());
        err.add_param("pattern".into(), &MRI_RE.as_str());
        err.add_param("value".into(), &json!(self.0));

        let mut errors = ValidationErrors::new();
        errors.add("mri", err);
        Err(errors)
    }
}

/// Data category of the payloads that a metric is extracted from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataCategory {
    Transaction,
}

/// TagSpec configures a tag which is added to an extracted metric.
///
/// Tag values are either static, when given through `value`, or are read
/// dynamically from the payload when given through `field`. The two are
/// mutually exclusive and specifying both fails validation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TagSpec {
    /// # Name of the tag.
    pub key: String,
    /// # Payload field from which the tag value is read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// # Static tag value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// # Condition which must match for the tag to be applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<RuleCondition>,
}

impl TagSpec {
    /// A tag with a static value, which is applied unconditionally.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            field: None,
            value: Some(value.into()),
            condition: None,
        }
    }
}

impl Validate for TagSpec {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.key.is_empty() {
            let mut err = ValidationError::new("empty");
            err.message = Some("tag key cannot be empty".into());
            errors.add("key", err);
        }
        if self.field.is_some() && self.value.is_some() {
            let mut err = ValidationError::new("exclusive");
            err.message = Some(
                format!("tag {:?} may set `field` or `value`, but not both", self.key).into(),
            );
            err.add_param("field".into(), &self.field);
            err.add_param("value".into(), &self.value);
            errors.add("field", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// MetricSpec specifies a metric to extract from payloads.
///
/// How the metric's value is obtained depends on the type of its MRI:
///  - Counters count the occurrence of a matching payload and have no `field`.
///  - Distributions require a numeric `field`.
///  - Sets require a string `field`, which is emitted into the set as a unique value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MetricSpec {
    pub category: DataCategory,
    pub mri: Mri,
    /// # Payload field from which the metric value is read.
    /// Always serialized, and null for counters.
    #[serde(default)]
    pub field: Option<String>,
    /// # Condition which a payload must match for the metric to be extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<RuleCondition>,
    /// # Tags which are added to the extracted metric.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagSpec>,
}

impl Validate for MetricSpec {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match (self.mri.metric_type(), &self.field) {
            (None, _) => {
                if let Err(mri_errors) = self.mri.validate() {
                    errors = mri_errors;
                }
            }
            (Some(MetricType::Counter), Some(field)) => {
                let mut err = ValidationError::new("counter_field");
                err.message =
                    Some(format!("counter {} cannot read field {field:?}", self.mri).into());
                errors.add("field", err);
            }
            (Some(ty @ (MetricType::Distribution | MetricType::Set)), None) => {
                let mut err = ValidationError::new("missing_field");
                err.message =
                    Some(format!("metric {} of type {ty} requires a field", self.mri).into());
                errors.add("field", err);
            }
            _ => (),
        }

        let parent = if errors.is_empty() { Ok(()) } else { Err(errors) };
        ValidationErrors::merge_all(
            parent,
            "tags",
            self.tags.iter().map(TagSpec::validate).collect(),
        )
    }
}

/// MetricExtractionConfig configures the generic extraction of metrics from
/// all data categories.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MetricExtractionConfig {
    /// # Version of the configuration format.
    pub version: u16,
    /// # Ordered metrics to extract.
    pub metrics: Vec<MetricSpec>,
}

impl Validate for MetricExtractionConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        ValidationErrors::merge_all(
            Ok(()),
            "metrics",
            self.metrics.iter().map(MetricSpec::validate).collect(),
        )
    }
}
