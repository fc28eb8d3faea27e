use crate::output::Output;
use anyhow::Context;
use metric_extraction::{
    get_conditional_tagging_rules, get_extraction_config, histogram_outlier_rules,
    SearchResolver,
};
use rule_models::{Project, Validate};
use std::path::{Path, PathBuf};

#[derive(Debug, clap::Args)]
pub struct ProjectArgs {
    /// Path to a project fixture, as JSON (`.json`) or otherwise YAML.
    #[clap(long)]
    pub project: PathBuf,
}

/// Load a JSON or YAML document, choosing its format by file extension.
pub fn load_document<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or_default();

    if is_json {
        serde_json::from_slice(&content)
            .with_context(|| format!("failed to parse {} as JSON", path.display()))
    } else {
        serde_yaml::from_slice(&content)
            .with_context(|| format!("failed to parse {} as YAML", path.display()))
    }
}

pub fn do_extraction_config(args: &ProjectArgs, output: &Output) -> anyhow::Result<()> {
    let project: Project = load_document(&args.project)?;
    let config = get_extraction_config(&project, &SearchResolver);

    if let Some(config) = &config {
        config
            .validate()
            .context("compiled metric extraction config is invalid")?;
    } else {
        tracing::info!(project_id = project.id, "project has no metrics to extract");
    }
    output.print(&config)
}

pub fn do_tagging_rules(args: &ProjectArgs, output: &Output) -> anyhow::Result<()> {
    let project: Project = load_document(&args.project)?;
    output.print(&get_conditional_tagging_rules(&project))
}

pub fn do_outlier_rules(output: &Output) -> anyhow::Result<()> {
    output.print(histogram_outlier_rules())
}
