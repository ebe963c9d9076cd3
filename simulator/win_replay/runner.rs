// Win Replay Runner
//
// Drives a Monitor over a simulated clock: every tick jumps straight to the
// monitor's next deadline, so a run of hours replays in milliseconds.

use super::client::ScriptedClient;
use super::config::{Expectations, ScenarioFile};
use chrono::{TimeZone, Utc};
use pt_rust::pt_activity;
use pt_rust::pt_interface::{PeerId, PtTime, WinEvent};
use pt_rust::pt_report;
use pt_rust::pt_sinks::{CsvWinSink, MemoryWinSink, MultiWinSink, SinkError};
use pt_rust::{Monitor, OwnerBook, RoundReport, Session};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-owner outcome of a replay
pub struct OwnerResult {
    pub owner: String,
    pub rounds: u64,
    pub wins: usize,
    pub skipped: usize,
    pub sink_failures: usize,
    pub ended_at: PtTime,
    pub active: Vec<PeerId>,
    pub stale: Vec<PeerId>,
    pub table: String,
}

pub struct ReplayResult {
    pub name: String,
    pub seed: [u8; 32],
    pub owners: Vec<OwnerResult>,
    pub events: Vec<WinEvent>,
}

pub struct ReplayRunner {
    scenario: ScenarioFile,
    name: String,
    seed: [u8; 32],
}

impl ReplayRunner {
    pub fn new(scenario: ScenarioFile, name: String, seed: Option<[u8; 32]>) -> Self {
        let seed = seed.unwrap_or_else(|| {
            let mut seed = [0u8; 32];
            rand::thread_rng().fill(&mut seed);
            seed
        });
        Self {
            scenario,
            name,
            seed,
        }
    }

    fn start_time() -> PtTime {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn run(self) -> Result<ReplayResult, SinkError> {
        let config = self.scenario.config.clone();
        let round = Arc::new(AtomicUsize::new(0));
        let client = ScriptedClient::new(
            self.scenario.peers.clone(),
            round.clone(),
            StdRng::from_seed(self.seed),
            config.failure_rate,
            config.reward_per_win,
        );

        let memory = MemoryWinSink::new();
        let mut sink = MultiWinSink::new();
        sink.add_sink(Box::new(memory.clone()));
        if let Some(path) = &config.csv_export {
            sink.add_sink(Box::new(CsvWinSink::open(path)?));
        }

        let mut owners = OwnerBook::new();
        for (owner, peer_ids) in &self.scenario.owners {
            owners.add_owner(owner);
            owners.add_peers_text(owner, peer_ids);
        }
        let owner_labels: Vec<String> = owners.owners().cloned().collect();

        let mut session = Session::new(owners);
        let mut monitor = Monitor::new(Box::new(client), Box::new(sink), config.monitor_config());
        let mut results = Vec::new();

        for owner in owner_labels {
            let mut now = Self::start_time();
            round.store(0, Ordering::Relaxed);

            if let Err(e) = monitor.start(&session, &owner, now) {
                println!("  skipping {}: {}", owner, e);
                continue;
            }

            let mut reports: Vec<RoundReport> = Vec::new();
            while let Some(deadline) = monitor.next_deadline() {
                now = deadline.max(now);
                round.store(reports.len(), Ordering::Relaxed);
                if let Some(report) = monitor.tick(&mut session, now) {
                    println!("  {}", pt_report::round_line(&report));
                    reports.push(report);
                }
            }

            results.push(self.owner_result(&session, &owner, now, &reports));
        }

        Ok(ReplayResult {
            name: self.name,
            seed: self.seed,
            owners: results,
            events: memory.events(),
        })
    }

    fn owner_result(
        &self,
        session: &Session,
        owner: &str,
        now: PtTime,
        reports: &[RoundReport],
    ) -> OwnerResult {
        let config = &self.scenario.config;
        let ids = |entries: Vec<&pt_rust::LedgerEntry>| -> Vec<PeerId> {
            entries.iter().map(|e| e.snapshot.peer_id.clone()).collect()
        };

        let (active, stale, table) = match session.ledger(owner) {
            Some(ledger) => (
                ids(pt_activity::recently_active(
                    ledger,
                    now,
                    pt_rust::pt_config::seconds(config.active_window_secs),
                )),
                ids(pt_activity::stale(
                    ledger,
                    now,
                    pt_rust::pt_config::seconds(config.stale_window_secs),
                )),
                pt_report::peer_table(ledger),
            ),
            None => (Vec::new(), Vec::new(), String::new()),
        };

        OwnerResult {
            owner: owner.to_string(),
            rounds: reports.len() as u64,
            wins: reports.iter().map(|r| r.wins.len()).sum(),
            skipped: reports.iter().map(|r| r.skipped.len()).sum(),
            sink_failures: reports.iter().map(|r| r.sink_failures).sum(),
            ended_at: now,
            active,
            stale,
            table,
        }
    }
}

impl ReplayResult {
    pub fn total_wins(&self) -> usize {
        self.owners.iter().map(|o| o.wins).sum()
    }

    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║    WIN REPLAY RESULTS                                  ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Scenario: {}", self.name);
        println!("Recorded events: {}", self.events.len());
        println!();

        for owner in &self.owners {
            println!("═══ {} ═══", owner.owner);
            println!(
                "  Rounds: {}  Wins: {}  Skipped fetches: {}  Sink failures: {}",
                owner.rounds, owner.wins, owner.skipped, owner.sink_failures
            );
            println!("  Classified at: {}", pt_rust::pt_interface::format_time(&owner.ended_at));
            println!("  Recently active: {:?}", owner.active);
            println!("  Stale: {:?}", owner.stale);
            println!();
            for line in owner.table.lines() {
                println!("  {}", line);
            }
            println!();
        }

        let seed_hex: String = self.seed.iter().map(|b| format!("{:02x}", b)).collect();
        println!("seed: 0x{}", seed_hex);
    }

    /// Compare against the scenario's expectations, returns the failures
    pub fn check(&self, expect: &Expectations) -> Vec<String> {
        let mut failures = Vec::new();

        if let Some(expected) = expect.total_wins {
            if expected != self.total_wins() {
                failures.push(format!(
                    "total wins: expected {}, got {}",
                    expected,
                    self.total_wins()
                ));
            }
        }

        let mut active: Vec<PeerId> = self.owners.iter().flat_map(|o| o.active.clone()).collect();
        let mut stale: Vec<PeerId> = self.owners.iter().flat_map(|o| o.stale.clone()).collect();
        active.sort();
        stale.sort();

        for (label, expected, got) in [
            ("active", &expect.active, &active),
            ("stale", &expect.stale, &stale),
        ] {
            if let Some(expected) = expected {
                let mut expected = expected.clone();
                expected.sort();
                if &expected != got {
                    failures.push(format!("{}: expected {:?}, got {:?}", label, expected, got));
                }
            }
        }

        failures
    }
}
