// Lists ledger suppliers that the region mapping does not know about, so the
// mapping file can be completed by hand.
use clap::Parser;
use fines_dashboard::config::DashboardConfig;
use fines_dashboard::geo::{missing_suppliers, SupplierMapping};
use fines_dashboard::loader::{self, DataSources};
use fines_dashboard::util::format_int;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "List ledger suppliers missing from the region mapping")]
struct Cli {
    #[arg(long)]
    ledger: Option<PathBuf>,
    #[arg(long, default_value = "mapeamento_uf.csv")]
    mapping: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::default(),
    };
    let sources = DataSources::discover(&std::env::current_dir()?, cli.ledger, cli.mapping)?;
    let mapping = SupplierMapping::from_bytes(&loader::read_file(&sources.mapping)?)?;
    let dataset = loader::load_ledger(&loader::read_file(&sources.ledger)?, &mapping, &config)?;

    let in_ledger: BTreeSet<&str> = dataset
        .records
        .iter()
        .filter_map(|r| r.supplier.as_deref())
        .collect();
    let missing = missing_suppliers(&dataset.records, &mapping);

    println!("Suppliers in ledger: {}", format_int(in_ledger.len()));
    println!("Suppliers mapped: {}", format_int(mapping.suppliers().len()));
    println!("--- MISSING FROM MAPPING ({}) ---", format_int(missing.len()));
    for supplier in &missing {
        println!("{}", supplier);
    }
    Ok(())
}
