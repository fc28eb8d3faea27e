use crate::compile::load_document;
use crate::output::Output;
use event_stripper::{strip_event_data, FunctionPrefixDetector};
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct StripArgs {
    /// Path to the event to strip, as JSON (`.json`) or otherwise YAML.
    #[clap(long)]
    pub event: PathBuf,

    /// Function prefix which identifies frames of the SDK. May be repeated.
    /// Defaults to prefixes of the Cocoa SDK.
    #[clap(long = "sdk-function-prefix")]
    pub sdk_function_prefixes: Vec<String>,
}

pub fn do_strip_event(args: &StripArgs, output: &Output) -> anyhow::Result<()> {
    let event: serde_json::Value = load_document(&args.event)?;
    let Some(event) = event.as_object() else {
        anyhow::bail!("event {} must be an object", args.event.display());
    };

    let detector = if args.sdk_function_prefixes.is_empty() {
        FunctionPrefixDetector::cocoa()
    } else {
        FunctionPrefixDetector::new(args.sdk_function_prefixes.iter().cloned())
    };
    output.print(&strip_event_data(event, &detector))
}
