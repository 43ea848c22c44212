use clap::Parser;

use packscope::cli::{self, Cli};
use packscope::pipeline::{self, ExportSelector};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose);

    let options = cli.into_options();
    let selector: Option<&ExportSelector> = if options.interactive {
        Some(&cli::prompt_export_selection)
    } else {
        None
    };

    if let Err(error) = pipeline::run(&options, selector).await {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}
