// peer-tracker - command line front end
//
// Usage:
//   peer-tracker <config.yaml> users
//   peer-tracker <config.yaml> peers   <owner> [peer ids...]
//   peer-tracker <config.yaml> refresh <owner> [peer ids...]
//   peer-tracker <config.yaml> watch   <owner> [peer ids...]

use std::env;
use std::error::Error;
use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use simple_logger::SimpleLogger;

use pt_rust::pt_activity;
use pt_rust::pt_report;
use pt_rust::pt_scheduler;
use pt_rust::pt_sinks::{CsvWinSink, LogWinSink, MultiWinSink};
use pt_rust::{HttpPeerClient, Monitor, MonitorConfig, OwnerBook, Session, TrackerConfig};

fn usage(program: &str) {
    eprintln!("Usage: {} <config.yaml> <command> [args]", program);
    eprintln!("\nCommands:");
    eprintln!("  users                      list owners and how many peers they track");
    eprintln!("  peers   <owner> [ids...]   show the peer ids of an owner");
    eprintln!("  refresh <owner> [ids...]   poll once and print the peer table");
    eprintln!("  watch   <owner> [ids...]   poll until the time budget ends (enter stops)");
}

/// argv may be empty when the process is spawned without one
fn program_name(args: &[String]) -> &str {
    args.first().map_or("peer-tracker", String::as_str)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let program = program_name(&args);
    if args.len() < 3 {
        usage(program);
        std::process::exit(1);
    }

    let config = TrackerConfig::load(&args[1])?;
    SimpleLogger::new().with_level(config.level_filter()).init()?;

    let mut owners = match &config.roster_path {
        Some(path) => OwnerBook::load_roster(path)?,
        None => OwnerBook::new(),
    };

    let command = args[2].as_str();
    let owner = args.get(3).map(|s| s.as_str());
    if let Some(owner) = owner {
        owners.add_owner(owner);
        let added = owners.add_peers_text(owner, &args[4..].join(" "));
        if added > 0 {
            info!("added {} peer ids to {}", added, owner);
        }
    }

    match (command, owner) {
        ("users", _) => users(&owners),
        ("peers", Some(owner)) => peers(&owners, owner),
        ("refresh", Some(owner)) => refresh(&config, owners, owner)?,
        ("watch", Some(owner)) => watch(&config, owners, owner)?,
        _ => {
            usage(program);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn users(owners: &OwnerBook) {
    for owner in owners.owners() {
        let count = owners.peers(owner).map_or(0, |p| p.len());
        println!("{:<24} {} peers", owner, count);
    }
    println!("{}", pt_report::status_line(owners.len()));
}

fn peers(owners: &OwnerBook, owner: &str) {
    println!("Peer IDs for User: {}", owner);
    match owners.peers(owner) {
        Some(peers) if !peers.is_empty() => {
            for peer_id in peers {
                println!("  {}", peer_id);
            }
        }
        _ => println!("  No Peer IDs found."),
    }
}

fn build_monitor(config: &TrackerConfig) -> Result<Monitor, Box<dyn Error>> {
    let client = HttpPeerClient::new(config.endpoint.clone(), config.request_timeout())?;

    let mut sink = MultiWinSink::new();
    if let Some(path) = &config.sink.csv_path {
        sink.add_sink(Box::new(CsvWinSink::open(path)?));
        info!("recording wins to {}", path.display());
    }
    if config.sink.log_events {
        sink.add_sink(Box::new(LogWinSink));
    }
    if sink.is_empty() {
        warn!("no sink configured, win events are dropped");
    }

    Ok(Monitor::new(
        Box::new(client),
        Box::new(sink),
        MonitorConfig::from(config),
    ))
}

fn refresh(config: &TrackerConfig, owners: OwnerBook, owner: &str) -> Result<(), Box<dyn Error>> {
    let mut monitor = build_monitor(config)?;
    let mut session = Session::new(owners);

    println!("Fetching peer data...");
    let report = monitor.poll_round(&mut session, owner, Utc::now());
    println!("{}", pt_report::round_line(&report));
    println!("{}", pt_report::recorder_line(monitor.recorder()));

    match session.ledger(owner) {
        Some(ledger) if !ledger.is_empty() => println!("\n{}", pt_report::peer_table(ledger)),
        _ => println!("No data fetched."),
    }
    Ok(())
}

fn watch(config: &TrackerConfig, owners: OwnerBook, owner: &str) -> Result<(), Box<dyn Error>> {
    let mut monitor = build_monitor(config)?;
    let session = Session::new(owners);
    monitor.start(&session, owner, Utc::now())?;

    // any line on stdin asks the poller to stop; a closed stdin does not
    let (stdin_tx, stdin_rx) = mpsc::channel();
    thread::spawn(move || {
        if pt_scheduler::read_stop_line(io::stdin().lock()) {
            let _ = stdin_tx.send(());
        }
    });

    println!("Polling, press enter to stop.");
    let handle = pt_scheduler::spawn(monitor, session);
    let (monitor, session) = loop {
        if let Some(report) = handle.report_timeout(Duration::from_millis(250)) {
            println!("{}", pt_report::round_line(&report));
        }
        if stdin_rx.try_recv().is_ok() {
            break handle.stop();
        }
        if handle.is_finished() {
            while let Some(report) = handle.try_report() {
                println!("{}", pt_report::round_line(&report));
            }
            break handle.join();
        }
    };

    println!("{}", pt_report::recorder_line(monitor.recorder()));

    let ledger = match session.ledger(owner) {
        Some(ledger) => ledger,
        None => {
            println!("No data fetched.");
            return Ok(());
        }
    };

    let now = Utc::now();
    println!("\n{}", pt_report::peer_table(ledger));
    let active = pt_activity::recently_active(ledger, now, config.active_window());
    let stale = pt_activity::stale(ledger, now, config.stale_window());
    print!(
        "{}",
        pt_report::activity_list(
            &format!("Active in last {} min", config.active_window().num_minutes()),
            &active
        )
    );
    print!(
        "{}",
        pt_report::activity_list(
            &format!("Inactive for {} min", config.stale_window().num_minutes()),
            &stale
        )
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_name_fallback() {
        assert_eq!(program_name(&[]), "peer-tracker");
        let args = vec!["/usr/bin/pt".to_string(), "tracker.yaml".to_string()];
        assert_eq!(program_name(&args), "/usr/bin/pt");
    }
}
