use clap::Parser;
use district_geocoder::config::{self, Settings};
use district_geocoder::dataset::{self, StateIndex};
use district_geocoder::geocode::{Coordinate, FixedDelay, OpenMeteoClient, Pipeline, ProgressStore};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Fill in lat/lng for every district via the Open-Meteo geocoding API.
///
/// Progress is saved as it goes; re-running resumes without repeating
/// finished lookups. Districts that cannot be matched get their state's
/// center, or a fixed default coordinate as a last resort.
///
/// Examples:
///   geocode-districts --districts assets/data/districts.json --states assets/data/states.json
///   geocode-districts --districts d.json --states s.json --progress .geocode-progress.json
///   geocode-districts --districts d.json --states s.json --output out.json --delay-ms 500
#[derive(Parser)]
#[command(name = "geocode-districts", version, about, long_about = None)]
struct Cli {
    /// District dataset (JSON array with id, name, state_id).
    #[arg(long)]
    districts: PathBuf,

    /// State dataset (JSON array with id, name).
    #[arg(long)]
    states: PathBuf,

    /// Progress file. Defaults to <cache dir>/district-geocoder/progress.json.
    #[arg(long)]
    progress: Option<PathBuf>,

    /// Where to write the geocoded districts. Defaults to overwriting --districts.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Country code candidates must carry (ISO 3166-1 alpha-2).
    #[arg(long, default_value = "TR")]
    country: String,

    /// Language hint sent to the geocoder.
    #[arg(long, default_value = "tr")]
    language: String,

    /// Pause between remote queries, in milliseconds.
    #[arg(long, default_value_t = 150)]
    delay_ms: u64,

    /// Per-request timeout, in seconds.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Save progress after this many processed districts.
    #[arg(long, default_value_t = 50)]
    flush_every: usize,

    /// Last-resort latitude (defaults to Ankara).
    #[arg(long, allow_hyphen_values = true, requires = "default_lng")]
    default_lat: Option<f64>,

    /// Last-resort longitude (defaults to Ankara).
    #[arg(long, allow_hyphen_values = true, requires = "default_lat")]
    default_lng: Option<f64>,

    /// Geocoding endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Verbose logging (overridden by RUST_LOG).
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        let defaults = Settings::default();
        let default_coordinate = match (self.default_lat, self.default_lng) {
            (Some(lat), Some(lng)) => Coordinate::rounded(lat, lng),
            _ => defaults.default_coordinate,
        };
        Settings {
            country: self.country.clone(),
            language: self.language.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            delay: Duration::from_millis(self.delay_ms),
            flush_every: self.flush_every,
            default_coordinate,
            endpoint: self.endpoint.clone().unwrap_or(defaults.endpoint.clone()),
            ..defaults
        }
        .sanitized()
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = cli.settings();

    if let (Some(lat), Some(lng)) = (cli.default_lat, cli.default_lng) {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            eprintln!("Error: Invalid default coordinate. Lat: -90..90, Lng: -180..180");
            std::process::exit(1);
        }
    }

    // ── Load inputs ─────────────────────────────────────────────

    let mut districts = dataset::load_districts(&cli.districts).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let states = dataset::load_states(&cli.states).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let state_index = StateIndex::new(&states);

    let progress_path = cli.progress.clone().unwrap_or_else(config::default_progress_path);
    let mut store = ProgressStore::load(progress_path).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  Fix or remove the progress file to start over.");
        std::process::exit(1);
    });
    if !store.is_empty() {
        tracing::info!(cached = store.len(), "resuming");
    }

    // ── Resolve ─────────────────────────────────────────────────

    let client = OpenMeteoClient::new(settings.endpoint.clone(), settings.timeout);
    let pacer = FixedDelay::new(settings.delay);
    let mut pipeline = Pipeline::new(client, pacer, settings);
    let report = pipeline.run(&mut districts, &state_index, &mut store);

    // ── Write output ────────────────────────────────────────────

    let output = cli.output.as_ref().unwrap_or(&cli.districts);
    if let Err(e) = dataset::save_districts(output, &districts) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    eprintln!("\n  Done! {}/{} districts geocoded.", report.resolved(), report.total);
    if !report.fallback_districts.is_empty() {
        eprintln!("  Used state center for: {}", report.fallback_districts.join(", "));
    }
    if let Some(ref e) = report.final_flush_error {
        eprintln!("  Warning: progress was not saved: {}", e);
    }

    // JSON report to stdout
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: cannot serialize report: {}", e),
    }
}
