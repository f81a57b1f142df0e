//! Value-share allocation entry point: CLI wiring and config-driven run.

use std::path::{Path, PathBuf};
use std::process;

use ec_value_share::config::RunConfig;
use ec_value_share::io::export::{export_allocations, export_members, export_profiles};
use ec_value_share::observability::init_tracing;
use ec_value_share::runner::{RunResult, run};

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    dataset: Option<String>,
    consumption_price: Option<f64>,
    feed_in_price: Option<f64>,
    allocations_out: Option<String>,
    members_out: Option<String>,
    profiles_out: Option<String>,
    quiet: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("ec-value-share: value-share allocation for energy communities");
    eprintln!();
    eprintln!("Usage: ec-value-share [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>              Load run configuration from a TOML file");
    eprintln!("  --preset <name>              Use a built-in preset (baseline, no_feed_in, sunny)");
    eprintln!("  --dataset <path>             Read readings from a CSV dataset");
    eprintln!("  --consumption-price <f64>    Override the consumption price per kWh");
    eprintln!("  --feed-in-price <f64>        Override the feed-in price per kWh");
    eprintln!("  --allocations-out <path>     Export the allocation table to CSV");
    eprintln!("  --members-out <path>         Export member summaries to CSV");
    eprintln!("  --profiles-out <path>        Export hourly profiles to CSV");
    eprintln!("  --quiet                      Do not print per-record allocations");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                      Start REST API server after the run");
        eprintln!("  --port <u16>                 API server port (default: 3000)");
    }
    eprintln!("  --help                       Show this help message");
    eprintln!();
    eprintln!("Without --dataset or [dataset] path, a synthetic community is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: ec_value_share=info).");
}

fn next_value(args: &[String], i: &mut usize, flag: &str, what: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {flag} requires {what}");
        process::exit(1);
    }
    args[*i].clone()
}

fn next_price(args: &[String], i: &mut usize, flag: &str) -> f64 {
    let raw = next_value(args, i, flag, "a number");
    match raw.parse::<f64>() {
        Ok(p) => p,
        Err(_) => {
            eprintln!("error: {flag} value \"{raw}\" is not a valid number");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        dataset: None,
        consumption_price: None,
        feed_in_price: None,
        allocations_out: None,
        members_out: None,
        profiles_out: None,
        quiet: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => cli.config_path = Some(next_value(&args, &mut i, "--config", "a path")),
            "--preset" => cli.preset = Some(next_value(&args, &mut i, "--preset", "a name")),
            "--dataset" => cli.dataset = Some(next_value(&args, &mut i, "--dataset", "a path")),
            "--consumption-price" => {
                cli.consumption_price = Some(next_price(&args, &mut i, "--consumption-price"));
            }
            "--feed-in-price" => {
                cli.feed_in_price = Some(next_price(&args, &mut i, "--feed-in-price"));
            }
            "--allocations-out" => {
                let path = next_value(&args, &mut i, "--allocations-out", "a path");
                cli.allocations_out = Some(path);
            }
            "--members-out" => {
                cli.members_out = Some(next_value(&args, &mut i, "--members-out", "a path"));
            }
            "--profiles-out" => {
                cli.profiles_out = Some(next_value(&args, &mut i, "--profiles-out", "a path"));
            }
            "--quiet" | "-q" => cli.quiet = true,
            #[cfg(feature = "api")]
            "--serve" => {
                cli.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                let raw = next_value(&args, &mut i, "--port", "a u16 argument");
                if let Ok(p) = raw.parse::<u16>() {
                    cli.port = p;
                } else {
                    eprintln!("error: --port value \"{raw}\" is not a valid u16");
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Resolves the configuration: --config takes priority, then --preset,
/// then the baseline default. Command-line overrides are applied last.
fn load_config(cli: &CliArgs) -> RunConfig {
    let loaded = if let Some(ref path) = cli.config_path {
        RunConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        RunConfig::from_preset(name)
    } else {
        Ok(RunConfig::baseline())
    };
    let mut cfg = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(ref path) = cli.dataset {
        cfg.dataset.path = Some(PathBuf::from(path));
    }
    if let Some(p) = cli.consumption_price {
        cfg.tariff.consumption_price = p;
    }
    if let Some(p) = cli.feed_in_price {
        cfg.tariff.feed_in_price = p;
    }
    if let Some(ref path) = cli.allocations_out {
        cfg.output.allocations = Some(PathBuf::from(path));
    }
    if let Some(ref path) = cli.members_out {
        cfg.output.members = Some(PathBuf::from(path));
    }
    if let Some(ref path) = cli.profiles_out {
        cfg.output.profiles = Some(PathBuf::from(path));
    }
    cfg
}

fn exit_on_write_error(label: &str, path: &Path, written: std::io::Result<()>) {
    if let Err(e) = written {
        eprintln!("error: failed to write {label} to {}: {e}", path.display());
        process::exit(1);
    }
    eprintln!("{label} written to {}", path.display());
}

fn write_outputs(cfg: &RunConfig, result: &RunResult) {
    if let Some(ref path) = cfg.output.allocations {
        let records: Vec<_> = result.records().cloned().collect();
        exit_on_write_error("Allocations", path, export_allocations(&records, path));
    }
    if let Some(ref path) = cfg.output.members {
        let written = export_members(&result.members, path);
        exit_on_write_error("Member summaries", path, written);
    }
    if let Some(ref path) = cfg.output.profiles {
        let written = export_profiles(&result.profiles, path);
        exit_on_write_error("Hourly profiles", path, written);
    }
}

fn main() {
    init_tracing();
    let cli = parse_args();
    let cfg = load_config(&cli);

    let result = match run(&cfg) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    if !cli.quiet {
        for r in result.records() {
            println!("{r}");
        }
        println!();
    }
    println!("{result}");

    write_outputs(&cfg, &result);

    // Start API server if requested
    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(ec_value_share::api::AppState {
            tariff: result.tariff,
            groups: result.outcome.groups.len(),
            rejected_groups: result.outcome.rejected.len(),
            indices: result.indices.clone(),
            records: result.records().cloned().collect(),
            members: result.members,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(ec_value_share::api::serve(state, addr)) {
            eprintln!("error: API server failed on {addr}: {e}");
            process::exit(1);
        }
    }
}
