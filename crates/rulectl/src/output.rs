use serde::Serialize;
use std::io::{self, Write};

#[derive(clap::Args, Clone, Debug)]
pub struct Output {
    /// How to format CLI output
    #[clap(
        global = true,
        short,
        long,
        value_enum,
        default_value_t = OutputType::Json,
        env = "RULECTL_OUTPUT"
    )]
    pub output: OutputType,
}

#[derive(clap::ValueEnum, Debug, Copy, Clone, PartialEq)]
pub enum OutputType {
    /// Format output as pretty-printed JSON
    Json,
    /// Format output as YAML
    Yaml,
}

impl Output {
    /// Print `item` to stdout in the selected format.
    pub fn print<T: Serialize + ?Sized>(&self, item: &T) -> anyhow::Result<()> {
        let mut stdout = io::stdout().lock();

        match self.output {
            OutputType::Json => serde_json::to_writer_pretty(&mut stdout, item)?,
            OutputType::Yaml => serde_yaml::to_writer(&mut stdout, item)?,
        }
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
