//! goplanes: converts a directory of SGF records into training data.
//!
//! Usage:
//!   goplanes <root_dir> <features_base> <targets_base> <winners_base> [OPTIONS]
//!
//! Writes `<base>_<i>` zstd shards for each of the three streams. Set
//! `RUST_LOG` to control log output (default: info).

use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::fmt::format;
use tracing_subscriber::EnvFilter;

use goplanes::samples::{self, ConvertConfig, Manifest};

fn main() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .event_format(format().with_target(false).without_time())
        .init();

    let args: Vec<String> = env::args().collect();
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut manifest_path: Option<PathBuf> = None;

    let mut config = match config_path(&args) {
        Some(path) => match samples::load_config(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                error!(path = %path, error = %e, "failed to load config");
                process::exit(1);
            }
        },
        None => ConvertConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--start" => {
                i += 1;
                config.start = parse_value(&args, i, "--start");
            }
            "--stop" => {
                i += 1;
                config.stop = Some(parse_value(&args, i, "--stop"));
            }
            "--round-robin" => {
                i += 1;
                config.round_robin_count = parse_value(&args, i, "--round-robin");
            }
            "--threads" => {
                i += 1;
                config.threads = parse_value(&args, i, "--threads");
            }
            "--seed" => {
                i += 1;
                config.seed = parse_value(&args, i, "--seed");
            }
            "--moves-per-game" => {
                i += 1;
                config.moves_per_game = Some(parse_value(&args, i, "--moves-per-game"));
            }
            "--min-rank" => {
                i += 1;
                config.min_rank = Some(parse_value(&args, i, "--min-rank"));
            }
            "--config" => {
                // Loaded before the other flags so they can override it.
                i += 1;
            }
            "--manifest" => {
                i += 1;
                manifest_path = Some(PathBuf::from(parse_value::<String>(&args, i, "--manifest")));
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other if other.starts_with("--") => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
            other => positional.push(PathBuf::from(other)),
        }
        i += 1;
    }

    let [root, features, targets, winners] = match <[PathBuf; 4]>::try_from(positional) {
        Ok(paths) => paths,
        Err(_) => {
            print_usage();
            process::exit(1);
        }
    };
    if config.round_robin_count == 0 {
        eprintln!("--round-robin must be at least 1");
        process::exit(1);
    }

    info!(
        threads = config.threads,
        seed = config.seed,
        shards = config.round_robin_count,
        "starting conversion"
    );
    let start = Instant::now();
    let stats = match samples::run_conversion(&root, &features, &targets, &winners, &config) {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "conversion failed");
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();
    info!(
        seconds = %format!("{:.1}", elapsed.as_secs_f64()),
        samples_per_sec = %format!("{:.0}", stats.samples_written as f64 / elapsed.as_secs_f64().max(1e-9)),
        "done"
    );

    if let Some(path) = manifest_path {
        let manifest = Manifest::new(&config, stats);
        let written = File::create(&path)
            .map_err(|e| e.to_string())
            .and_then(|file| manifest.write_json(BufWriter::new(file)).map_err(|e| e.to_string()));
        match written {
            Ok(()) => info!(path = %path.display(), "wrote manifest"),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to write manifest");
                process::exit(1);
            }
        }
    }
}

fn config_path(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_value<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|s| s.parse()) {
        Some(Ok(value)) => value,
        _ => {
            eprintln!("invalid {} value", flag);
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: goplanes <root_dir> <features_base> <targets_base> <winners_base> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --start N           First record after shuffling (default: 0)");
    eprintln!("  --stop N            One past the last record (default: all)");
    eprintln!("  --round-robin N     Output shards per stream (default: 1)");
    eprintln!("  --threads N         Worker threads (default: 4)");
    eprintln!("  --seed N            Shuffle and sampling seed (default: 12345)");
    eprintln!("  --moves-per-game N  Sample N random moves per game (default: all)");
    eprintln!("  --min-rank N        Skip moves by players ranked below N (default: none)");
    eprintln!("  --config FILE       Load settings from a JSON file; flags override it");
    eprintln!("  --manifest FILE     Write a JSON description of the output");
    eprintln!("  --help              Show this help");
}
