// Scenario Runner - Load and replay win scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/first_sighting.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/flaky_endpoint.yaml --seed 0x1234...

mod win_replay;

use simple_logger::SimpleLogger;
use std::env;
use std::fs;
use std::path::Path;
use win_replay::{ReplayRunner, ScenarioFile};

fn main() {
    let args: Vec<String> = env::args().collect();

    let program = args.first().map_or("scenario_runner", String::as_str);

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX]", program);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/first_sighting.yaml", program);
        eprintln!("  {} scenarios/", program);
        eprintln!("  {} scenarios/flaky_endpoint.yaml --seed 0x123456...", program);
        std::process::exit(1);
    }

    // round logs of the library stay quiet unless asked for
    let _ = SimpleLogger::new().with_level(log::LevelFilter::Warn).env().init();

    let path = Path::new(&args[1]);

    let seed: Option<[u8; 32]> = if args.len() >= 4 && args[2] == "--seed" {
        Some(parse_seed_hex(&args[3]))
    } else {
        None
    };

    let failed = if path.is_file() {
        !run_scenario_file(path, seed)
    } else if path.is_dir() {
        !run_scenario_directory(path, seed)
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    };

    if failed {
        std::process::exit(2);
    }
}

/// Returns true when every scenario met its expectations
fn run_scenario_directory(dir: &Path, seed: Option<[u8; 32]>) -> bool {
    let mut scenarios = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    println!("Found {} scenario(s) to run\n", scenarios.len());

    let mut all_passed = true;
    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        all_passed &= run_scenario_file(scenario_path, seed);
    }
    all_passed
}

fn run_scenario_file(path: &Path, seed: Option<[u8; 32]>) -> bool {
    println!("Loading scenario from: {}", path.display());

    let yaml_content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let mut scenario: ScenarioFile = serde_yaml::from_str(&yaml_content).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let name = scenario.meta.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scenario")
            .to_string()
    });
    println!("\n═══ {} ═══\n", name);

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    if let Some(ref hypothesis) = scenario.meta.hypothesis {
        println!("Hypothesis:");
        println!("  {}\n", hypothesis);
    }

    println!("Configuration:");
    println!("  Owners: {}", scenario.owners.len());
    println!("  Scripted peers: {}", scenario.peers.len());
    println!(
        "  Interval: {}s, run: {}s",
        scenario.config.poll_interval_secs, scenario.config.max_run_secs
    );
    println!("  First observation: {:?}", scenario.config.first_observation);
    println!("  Failure rate: {:.0}%", scenario.config.failure_rate * 100.0);
    println!();

    let expect = std::mem::take(&mut scenario.expect);
    let result = match ReplayRunner::new(scenario, name, seed).run() {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Replay failed: {}", e);
            return false;
        }
    };

    result.print_summary();

    let failures = result.check(&expect);
    if failures.is_empty() {
        println!("\n✓ Scenario complete!\n");
        true
    } else {
        for failure in &failures {
            println!("✗ {}", failure);
        }
        false
    }
}

fn parse_seed_hex(hex: &str) -> [u8; 32] {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    let mut seed = [0u8; 32];

    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        if i >= 32 {
            break;
        }
        let parsed = std::str::from_utf8(chunk)
            .ok()
            .and_then(|s| u8::from_str_radix(s, 16).ok());
        seed[i] = parsed.unwrap_or_else(|| {
            eprintln!("Invalid hex seed: {}", hex);
            std::process::exit(1);
        });
    }

    seed
}
