use billing_engine::application::scenario::ScenarioRunner;
use billing_engine::interfaces::csv::catalog_reader::CatalogReader;
use billing_engine::interfaces::csv::report_writer::ReportWriter;
use billing_engine::interfaces::csv::script_reader::ScriptReader;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario script CSV file
    script: PathBuf,

    /// Catalog CSV preloaded into the simulated store backend (optional).
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Load the store-side catalog, skipping rows that fail to parse
    let mut catalog = Vec::new();
    if let Some(path) = cli.catalog {
        let file = File::open(path).into_diagnostic()?;
        let reader = CatalogReader::new(file);
        for entry in reader.products() {
            match entry {
                Ok(product) => catalog.push(product),
                Err(e) => {
                    eprintln!("Error reading catalog entry: {}", e);
                }
            }
        }
    }

    // Replay the scripted session
    let runner = ScenarioRunner::new(catalog);
    let file = File::open(cli.script).into_diagnostic()?;
    let reader = ScriptReader::new(file);
    let report = runner.run(reader.commands()).await;

    // Output per-row outcomes and the final ledger
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(&report).into_diagnostic()?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
