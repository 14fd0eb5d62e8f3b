// Entry point and interactive menu.
//
// Every "show" recomputes the dashboard from the cached dataset and the
// current filters; the dataset itself is reloaded only when one of the
// source files changes.
use clap::Parser;
use fines_dashboard::cache::DatasetCache;
use fines_dashboard::config::DashboardConfig;
use fines_dashboard::filter::{options, FilterState, Selection};
use fines_dashboard::loader::DataSources;
use fines_dashboard::table_filter::{column_kind, ColumnFilter};
use fines_dashboard::types::{Dataset, FineRecord};
use fines_dashboard::util::{format_int, parse_date_dayfirst};
use fines_dashboard::{output, reports, Error};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing_subscriber::EnvFilter;

const PREVIEW_ROWS: usize = 20;

#[derive(Parser)]
#[command(about = "Traffic-fine dashboard")]
struct Cli {
    /// Fine ledger; defaults to the first non-mapping CSV in the working directory.
    #[arg(long)]
    ledger: Option<PathBuf>,
    #[arg(long, default_value = "mapeamento_uf.csv")]
    mapping: PathBuf,
    /// JSON file overriding column names and fallbacks.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "logo.png")]
    logo: PathBuf,
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,
    /// Render the dashboard once and exit.
    #[arg(long)]
    once: bool,
}

struct Settings {
    sources: DataSources,
    config: DashboardConfig,
    logo: PathBuf,
    export_dir: PathBuf,
}

// Dataset cache and filters live for the whole session so the files are
// only read again when they change.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    cache: DatasetCache,
    filters: FilterState,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

fn split_values(input: &str) -> Vec<String> {
    input
        .split('|')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn prompt_date(label: &str, current: Option<chrono::NaiveDate>) -> Option<chrono::NaiveDate> {
    let input = prompt(label);
    if input.is_empty() {
        return current;
    }
    if input == "-" {
        return None;
    }
    let parsed = parse_date_dayfirst(&input);
    if parsed.is_none() {
        println!("Invalid date `{}`, keeping the previous value.", input);
        return current;
    }
    parsed
}

/// Ask for a list pick or a prefix search on one field.
fn prompt_selection(label: &str, values: &[String], current: &Selection) -> Selection {
    println!("\n{} search: [1] List  [2] Type  [blank] keep  [-] all", label);
    match prompt("> ").as_str() {
        "1" => {
            println!("{} {} value(s): {}", format_int(values.len()), label, values.join(" | "));
            let picked = split_values(&prompt(&format!("{}s (separated by |): ", label)));
            if picked.is_empty() {
                Selection::All
            } else {
                Selection::OneOf(picked)
            }
        }
        "2" => {
            let query = prompt(&format!("{} starts with: ", label));
            if query.is_empty() {
                Selection::All
            } else {
                Selection::Prefix(query)
            }
        }
        "-" => Selection::All,
        _ => current.clone(),
    }
}

/// Handle option [1]: (re)load both files, printing what the cleaning did.
fn handle_load(settings: &Settings) {
    let mut state = state();
    state.cache.invalidate();
    match state.cache.get_or_load(&settings.sources, &settings.config) {
        Ok(data) => {
            let r = &data.report;
            println!(
                "Processing dataset... ({} rows read, {} records loaded)",
                format_int(r.total_rows),
                format_int(data.records.len())
            );
            if r.skipped_rows > 0 {
                println!("Note: {} malformed rows skipped.", format_int(r.skipped_rows));
            }
            match (&r.date_column, r.date_fallback_used) {
                (Some(col), true) => println!("Info: dates read from fallback column `{}`.", col),
                (Some(col), false) => println!("Info: dates read from `{}`.", col),
                (None, _) => println!("Info: no date column found; records are undated."),
            }
            if r.undated_rows > 0 {
                println!(
                    "Info: {} records have no valid date and are dropped by any date bound.",
                    format_int(r.undated_rows)
                );
            }
            if r.unmatched_suppliers > 0 {
                println!(
                    "Info: {} records have no region mapping.",
                    format_int(r.unmatched_suppliers)
                );
            }
            println!();
        }
        Err(e) => eprintln!("Failed to load files: {}\n", e),
    }
}

fn render(settings: &Settings, dataset: &Dataset, filters: &FilterState) -> String {
    let outcome = filters.apply(dataset);
    for notice in &outcome.notices {
        println!("{}", notice);
    }
    let dashboard = reports::generate_dashboard(dataset, &outcome.rows, &settings.config);
    let table = reports::sorted_for_table(&outcome.rows);
    let logo = settings.logo.exists().then_some(settings.logo.as_path());
    output::render_dashboard(dataset, &dashboard, &table, logo, PREVIEW_ROWS)
}

/// Handle option [2]: recompute and print the dashboard.
fn handle_show(settings: &Settings) -> Result<(), Error> {
    let mut state = state();
    let AppState { cache, filters } = &mut *state;
    let dataset = cache.get_or_load(&settings.sources, &settings.config)?;
    if !filters.is_empty() {
        println!("(filters active)");
    }
    println!("{}", render(settings, dataset, filters));
    Ok(())
}

/// Handle option [3]: date range and field selections.
fn handle_set_filters(settings: &Settings) -> Result<(), Error> {
    let mut state = state();
    let AppState { cache, filters } = &mut *state;
    let dataset = cache.get_or_load(&settings.sources, &settings.config)?;
    let rows: Vec<&FineRecord> = dataset.records.iter().collect();

    println!("Dates as dd/mm/yyyy; blank keeps the current value, `-` clears it.");
    filters.start = prompt_date("Start: ", filters.start);
    filters.end = prompt_date("End: ", filters.end);

    if dataset.columns.plate.is_some() {
        filters.plates = prompt_selection("Plate", &options(&rows, |r| r.plate.as_deref()), &filters.plates);
    }
    if dataset.columns.operation.is_some() {
        filters.operations = prompt_selection(
            "Operation",
            &options(&rows, |r| r.operation.as_deref()),
            &filters.operations,
        );
    }
    if dataset.columns.reason.is_some() {
        filters.reasons = prompt_selection(
            "Reason",
            &options(&rows, |r| Some(r.reason.as_str())),
            &filters.reasons,
        );
    }

    let regions = options(&rows, |r| Some(r.region.as_str()));
    println!("\nRegions: {}", regions.join(" | "));
    let input = prompt("Regions (separated by |, blank keeps, `-` for all): ");
    if input == "-" {
        filters.regions.clear();
    } else if !input.is_empty() {
        filters.regions = split_values(&input);
    }
    println!();
    Ok(())
}

/// Handle option [4]: add a filter on any table column.
fn handle_column_filter(settings: &Settings) -> Result<(), Error> {
    let mut state = state();
    let AppState { cache, filters } = &mut *state;
    let dataset = cache.get_or_load(&settings.sources, &settings.config)?;
    let current = filters.apply(dataset).rows;

    println!("Columns: {}", dataset.table_columns().join(" | "));
    let column = prompt("Column (blank to cancel): ");
    if column.is_empty() {
        return Ok(());
    }
    let kind = column_kind(dataset, &current, &column)?;
    println!("{:?} column: {}", kind, kind.hint());
    let input = prompt("Filter: ");
    let filter = ColumnFilter::build(dataset, &current, &column, &input)?;
    filters.columns.push(filter);
    println!();
    Ok(())
}

/// Handle option [6]: write chart data and filtered rows to the export dir.
fn handle_export(settings: &Settings) -> Result<(), Error> {
    let mut state = state();
    let AppState { cache, filters } = &mut *state;
    let dataset = cache.get_or_load(&settings.sources, &settings.config)?;
    let outcome = filters.apply(dataset);
    let dashboard = reports::generate_dashboard(dataset, &outcome.rows, &settings.config);
    let dir = &settings.export_dir;

    output::write_json(&dir.join("dashboard.json"), &dashboard)?;
    if let reports::Panel::Ready(points) = &dashboard.map {
        output::write_csv(&dir.join("map_points.csv"), points)?;
    }
    if let reports::Panel::Ready(reasons) = &dashboard.reasons {
        output::write_csv(&dir.join("reasons.csv"), reasons)?;
    }
    output::write_csv(&dir.join("monthly_cost.csv"), &dashboard.timeline.months)?;

    let path = dir.join("filtered_rows.csv");
    let file = std::fs::File::create(&path).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;
    output::write_records_csv(file, dataset, &reports::sorted_for_table(&outcome.rows))?;
    println!("Exported dashboard to {}\n", dir.display());
    Ok(())
}

fn report(result: Result<(), Error>) {
    if let Err(e) = result {
        eprintln!("Error: {}\n", e);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::default(),
    };
    let sources = DataSources::discover(&std::env::current_dir()?, cli.ledger, cli.mapping)?;
    let settings = Settings {
        sources,
        config,
        logo: cli.logo,
        export_dir: cli.export_dir,
    };

    if cli.once {
        handle_show(&settings)?;
        return Ok(());
    }

    loop {
        println!("Select an option:");
        println!("[1] Load the files");
        println!("[2] Show dashboard");
        println!("[3] Set filters");
        println!("[4] Filter by column");
        println!("[5] Clear filters");
        println!("[6] Export");
        println!("[0] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(&settings),
            "2" => report(handle_show(&settings)),
            "3" => report(handle_set_filters(&settings)),
            "4" => report(handle_column_filter(&settings)),
            "5" => {
                state().filters = FilterState::default();
                println!("Filters cleared.\n");
            }
            "6" => report(handle_export(&settings)),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-6.\n"),
        }
    }
    Ok(())
}
