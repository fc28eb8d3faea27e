use clap::Parser;

fn main() -> Result<(), anyhow::Error> {
    let cli = rulectl::Cli::parse();
    rulectl::init_logging(&cli.log_args);

    let result = cli.run();

    if let Err(err) = result.as_ref() {
        tracing::error!(error = ?err, "subcommand failed");
    }
    result
}
