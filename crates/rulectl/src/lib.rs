use clap::Parser;

mod compile;
mod logging;
mod output;
mod schema;
mod strip;

pub use logging::{init_logging, LogArgs, LogFormat, LogLevel};
pub use output::{Output, OutputType};

/// Compiles alerts and thresholds of projects into metric extraction configs
/// and conditional tagging rules.
#[derive(Debug, Parser)]
#[clap(author, about, version)]
pub struct Cli {
    #[clap(subcommand)]
    cmd: Command,

    #[clap(flatten)]
    output: Output,

    #[clap(flatten)]
    pub log_args: LogArgs,
}

#[derive(Debug, clap::Subcommand)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Print the metric extraction config of a project.
    ///
    /// Alerts of the project which use custom filters are compiled into
    /// metrics to extract. Prints null if the project has no metrics to
    /// extract, or doesn't have the on-demand-metrics-extraction capability.
    ExtractionConfig(compile::ProjectArgs),
    /// Print the ordered conditional tagging rules of a project.
    ///
    /// Rules of transaction threshold overrides come first, then rules of the
    /// project-wide threshold, and then histogram outlier rules.
    TaggingRules(compile::ProjectArgs),
    /// Print the histogram outlier rules, which are shared by all projects.
    OutlierRules,
    /// Print the JSON schema of a document.
    JsonSchema(schema::SchemaArgs),
    /// Strip an event down to allowed fields and frames of the SDK.
    StripEvent(strip::StripArgs),
}

impl Cli {
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::ExtractionConfig(args) => compile::do_extraction_config(args, &self.output),
            Command::TaggingRules(args) => compile::do_tagging_rules(args, &self.output),
            Command::OutlierRules => compile::do_outlier_rules(&self.output),
            Command::JsonSchema(args) => schema::do_json_schema(args, &self.output),
            Command::StripEvent(args) => strip::do_strip_event(args, &self.output),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Cli, Command, LogFormat, LogLevel, OutputType};
    use clap::Parser;

    #[test]
    fn test_argument_parsing() {
        let cli = Cli::try_parse_from([
            "rulectl",
            "tagging-rules",
            "--project",
            "project.yaml",
            "--output",
            "yaml",
            "--log.level=debug",
            "--log.format=json",
        ])
        .unwrap();

        let Command::TaggingRules(args) = &cli.cmd else {
            panic!("expected tagging-rules, got {:?}", cli.cmd);
        };
        assert!(args.project.ends_with("project.yaml"));
        assert_eq!(cli.output.output, OutputType::Yaml);
        assert_eq!(cli.log_args.level, LogLevel::Debug);
        assert_eq!(cli.log_args.format, LogFormat::Json);

        Cli::try_parse_from(["rulectl", "extraction-config"]).unwrap_err();
        Cli::try_parse_from(["rulectl", "json-schema", "bogus"]).unwrap_err();
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
