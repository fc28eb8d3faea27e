use crate::output::Output;
use rule_models::{MetricConditionalTaggingRule, MetricExtractionConfig, Project, RuleCondition};

#[derive(Debug, clap::Args)]
pub struct SchemaArgs {
    /// Type of the document to print a JSON schema for.
    #[clap(value_enum)]
    pub document: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Document {
    /// A metric extraction config.
    ExtractionConfig,
    /// A conditional tagging rule.
    TaggingRule,
    /// A rule condition.
    Condition,
    /// A project fixture, as accepted by other subcommands.
    Project,
}

pub fn do_json_schema(args: &SchemaArgs, output: &Output) -> anyhow::Result<()> {
    let schema = match args.document {
        Document::ExtractionConfig => schemars::schema_for!(MetricExtractionConfig),
        Document::TaggingRule => schemars::schema_for!(MetricConditionalTaggingRule),
        Document::Condition => schemars::schema_for!(RuleCondition),
        Document::Project => schemars::schema_for!(Project),
    };
    output.print(&schema)
}
