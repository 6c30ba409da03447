use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use hazard_pulse::alerts::{filter_by_level, CommunityAlertFeed};
use hazard_pulse::geo::{format_coords, format_distance};
use hazard_pulse::location::{
    DisabledGeolocator, IpGeolocator, LastLocationCache, LocationProvider,
    RequestOutcome,
};
use hazard_pulse::server::{self, DEFAULT_RADIUS_KM};
use hazard_pulse::{Aggregator, Coordinate, EngineConfig, HazardReport, Severity};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Hazard Pulse: nearby earthquakes, wildfires, storms and community alerts.
///
/// Examples:
///   hazard nearby --lat 34.0754 --lon -84.2941
///   hazard nearby --auto --radius 300 --tz America/New_York
///   hazard nearby --level alert
///   hazard alerts --level emergency
///   hazard serve --port 3000
#[derive(Parser)]
#[command(name = "hazard", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging (debug level) on stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Per-source timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Path of the last-known location file.
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Offline mode: never ask for the device location.
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List hazards around a location.
    Nearby(NearbyArgs),
    /// Show community alerts.
    Alerts {
        /// Only alerts at this level (info, alert, emergency).
        #[arg(long, value_parser = parse_level)]
        level: Option<Severity>,
    },
    /// Detect the current location and remember it.
    Locate,
    /// Remember a manually entered location.
    SetLocation {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Args)]
struct NearbyArgs {
    /// Latitude (-90 to 90). Remembered as the new location.
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,

    /// Longitude (-180 to 180).
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// Detect the location instead of using the remembered one.
    #[arg(long, short = 'a', conflicts_with = "lat")]
    auto: bool,

    /// Search radius in kilometers.
    #[arg(long, short = 'r', default_value_t = DEFAULT_RADIUS_KM)]
    radius: f64,

    /// IANA timezone for displayed times (e.g. America/New_York). Defaults to UTC.
    #[arg(long)]
    tz: Option<String>,

    /// Only events at or above this severity.
    #[arg(long, value_parser = parse_level)]
    level: Option<Severity>,
}

fn parse_level(s: &str) -> Result<Severity, String> {
    s.parse()
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = EngineConfig::from_env();
    if let Some(secs) = cli.timeout {
        config.source_timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(ref path) = cli.cache {
        config.cache_path = path.clone();
    }

    let provider = Arc::new(build_provider(&config, cli.offline));

    match cli.command {
        Command::Nearby(args) => nearby(&config, &provider, args).await,
        Command::Alerts { level } => {
            let alerts = filter_by_level(CommunityAlertFeed::from_config(&config).fetch(), level);
            for alert in &alerts {
                eprintln!(
                    "  [{:<9}] {}  ({}, {})",
                    alert.level.to_string().to_uppercase(),
                    alert.headline,
                    alert.area,
                    alert.source,
                );
            }
            print_json(&alerts);
        }
        Command::Locate => {
            let c = locate(&provider);
            eprintln!("  \u{1F4CD} {}", format_coords(c));
            print_json(&provider.snapshot());
        }
        Command::SetLocation { lat, lon } => {
            let c = checked(lat, lon);
            provider.set_location(c).unwrap_or_else(|e| fail(e));
            eprintln!("  \u{1F4CD} {} (saved)", format_coords(c));
            print_json(&provider.snapshot());
        }
        Command::Serve { host, port } => server::start(&host, port, &config, provider).await,
    }
}

fn build_provider(config: &EngineConfig, offline: bool) -> LocationProvider {
    let cache = LastLocationCache::new(config.cache_path.clone());
    if offline {
        LocationProvider::new(DisabledGeolocator, cache)
    } else {
        LocationProvider::new(IpGeolocator::from_config(config), cache)
    }
}

fn checked(lat: f64, lon: f64) -> Coordinate {
    let c = Coordinate::new(lat, lon);
    if !c.is_finite() || !c.in_range() {
        fail("Invalid coordinates. Lat: -90..90, Lon: -180..180");
    }
    c
}

fn locate(provider: &LocationProvider) -> Coordinate {
    match provider.request_location() {
        Ok(RequestOutcome::Resolved(c)) => c,
        Ok(RequestOutcome::AlreadyResolving) => fail("A location request is already in progress."),
        Err(e) => fail(format!("{}. Enter coordinates with --lat/--lon.", e)),
    }
}

async fn nearby(config: &EngineConfig, provider: &LocationProvider, args: NearbyArgs) {
    // Priority: --lat/--lon > --auto > remembered location > error
    let reference = if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        let c = checked(lat, lon);
        provider.set_location(c).unwrap_or_else(|e| fail(e));
        c
    } else if args.auto {
        locate(provider)
    } else {
        provider.coordinate().unwrap_or_else(|| {
            eprintln!("Error: No location known yet.");
            eprintln!();
            eprintln!("Usage:");
            eprintln!("  hazard nearby --lat 34.0754 --lon -84.2941");
            eprintln!("  hazard nearby --auto");
            std::process::exit(1);
        })
    };

    if !args.radius.is_finite() || args.radius <= 0.0 {
        fail("Radius must be a positive number of km.");
    }

    let tz: Tz = match &args.tz {
        Some(name) => name.parse().unwrap_or_else(|_| {
            fail(format!(
                "Unknown timezone '{}'. Use IANA format (e.g. America/New_York).",
                name
            ))
        }),
        None => Tz::UTC,
    };

    let aggregator = Aggregator::from_config(config);
    let mut report = aggregator
        .aggregate_report(reference, args.radius)
        .await
        .unwrap_or_else(|e| fail(format!("{}. Try again shortly.", e)));

    if let Some(min) = args.level {
        report.events.retain(|e| e.severity >= min);
    }

    eprintln!(
        "  \u{1F4CD} {} \u{00B7} radius {}",
        format_coords(reference),
        format_distance(args.radius)
    );
    print_table(&report, tz);
    print_json(&report);
}

fn print_table(report: &HazardReport, tz: Tz) {
    for failure in &report.failures {
        eprintln!("  \u{26A0}\u{FE0F}  {} unavailable: {}", failure.source, failure.error);
    }
    if report.events.is_empty() {
        eprintln!("  No recent hazards found within the selected radius.");
        return;
    }
    for event in &report.events {
        let distance = event
            .distance_km
            .map(format_distance)
            .unwrap_or_else(|| "?".into());
        eprintln!(
            "  [{:<9}] {:<10} {:>8}  {}  {}",
            event.severity.to_string().to_uppercase(),
            event.source.to_string(),
            distance,
            event.timestamp.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
            event.title,
        );
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}
