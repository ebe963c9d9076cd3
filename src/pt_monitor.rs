//! Polling monitor
//!
//! Two states: `Idle` and `Polling`. The monitor never sleeps itself; the
//! caller drives it with `tick(session, now)` and uses `next_deadline()` to know
//! when to call again (see `pt_scheduler` for a thread doing exactly that).
//!
//! ```
//! use pt_rust::pt_config::TrackerConfig;
//! use pt_rust::pt_interface::{PeerInfo, PeerInfoClient};
//! use pt_rust::pt_monitor::{Monitor, MonitorConfig};
//! use pt_rust::pt_session::Session;
//! use pt_rust::pt_sinks::MemoryWinSink;
//!
//! struct Fixed;
//! impl PeerInfoClient for Fixed {
//!     fn fetch(&self, _peer_id: &str) -> Option<PeerInfo> {
//!         Some(PeerInfo { name: "n".to_string(), score: 1, reward: 0.0 })
//!     }
//! }
//!
//! let mut session = Session::default();
//! session.owners.add_peers_text("alice", "p1 p2");
//!
//! let config = MonitorConfig::from(&TrackerConfig::default());
//! let mut monitor = Monitor::new(Box::new(Fixed), Box::new(MemoryWinSink::new()), config);
//!
//! let now = chrono::Utc::now();
//! monitor.start(&session, "alice", now).unwrap();
//! let report = monitor.tick(&mut session, now).unwrap();
//! assert_eq!(report.fetched, 2);
//! ```

use chrono::Duration;
use log::{debug, info, warn};
use thiserror::Error;

use crate::pt_config::{seconds, FirstObservation, TrackerConfig};
use crate::pt_interface::{Owner, PeerId, PeerInfoClient, PtTime, Score, WinEventSink};
use crate::pt_recorder::ChangeRecorder;
use crate::pt_session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("unknown owner '{0}'")]
    UnknownOwner(Owner),

    #[error("owner '{0}' tracks no peers")]
    EmptyPeerSet(Owner),

    #[error("already polling for '{0}'")]
    AlreadyPolling(Owner),
}

/// Timing and policy of a polling run
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between two rounds
    pub poll_interval: Duration,

    /// A run returns to Idle this long after start
    pub max_run: Duration,

    pub first_observation: FirstObservation,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig::from(&TrackerConfig::default())
    }
}

impl From<&TrackerConfig> for MonitorConfig {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            poll_interval: seconds(config.poll_interval_secs),
            max_run: seconds(config.max_run_secs),
            first_observation: config.first_observation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorState {
    Idle,
    Polling {
        owner: Owner,
        started_at: PtTime,
        next_poll_at: PtTime,
        rounds: u64,
    },
}

/// A win detected during a round
#[derive(Debug, Clone, PartialEq)]
pub struct WinDelta {
    pub peer_id: PeerId,
    pub old_score: Score,
    pub new_score: Score,
    /// Whether the sink accepted the event
    pub recorded: bool,
}

/// Outcome of one poll round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub owner: Owner,
    pub time: PtTime,
    /// Round number within the current run, starting at 1 (0 outside a run)
    pub round: u64,
    pub polled: usize,
    pub fetched: usize,
    pub skipped: Vec<PeerId>,
    pub wins: Vec<WinDelta>,
    pub sink_failures: usize,
}

impl RoundReport {
    fn new(owner: &str, time: PtTime) -> Self {
        Self {
            owner: owner.to_string(),
            time,
            round: 0,
            polled: 0,
            fetched: 0,
            skipped: Vec::new(),
            wins: Vec::new(),
            sink_failures: 0,
        }
    }
}

pub struct Monitor {
    client: Box<dyn PeerInfoClient + Send>,
    recorder: ChangeRecorder,
    config: MonitorConfig,
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        client: Box<dyn PeerInfoClient + Send>,
        sink: Box<dyn WinEventSink + Send>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            client,
            recorder: ChangeRecorder::new(sink),
            config,
            state: MonitorState::Idle,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn recorder(&self) -> &ChangeRecorder {
        &self.recorder
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state, MonitorState::Polling { .. })
    }

    /// Idle -> Polling for `owner`; the first round is due immediately
    pub fn start(&mut self, session: &Session, owner: &str, now: PtTime) -> Result<(), MonitorError> {
        if let MonitorState::Polling { owner: current, .. } = &self.state {
            return Err(MonitorError::AlreadyPolling(current.clone()));
        }

        let peers = session
            .owners
            .peers(owner)
            .ok_or_else(|| MonitorError::UnknownOwner(owner.to_string()))?;
        if peers.is_empty() {
            return Err(MonitorError::EmptyPeerSet(owner.to_string()));
        }

        info!(
            "polling {} peers of {} every {}s for {}s",
            peers.len(),
            owner,
            self.config.poll_interval.num_seconds(),
            self.config.max_run.num_seconds()
        );

        self.state = MonitorState::Polling {
            owner: owner.to_string(),
            started_at: now,
            next_poll_at: now,
            rounds: 0,
        };
        Ok(())
    }

    /// Polling -> Idle. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        match std::mem::replace(&mut self.state, MonitorState::Idle) {
            MonitorState::Polling { owner, rounds, .. } => {
                info!("stopped polling {} after {} rounds", owner, rounds);
                true
            }
            MonitorState::Idle => false,
        }
    }

    /// When the caller must call `tick` next, `None` while idle
    pub fn next_deadline(&self) -> Option<PtTime> {
        match &self.state {
            MonitorState::Idle => None,
            MonitorState::Polling {
                started_at,
                next_poll_at,
                ..
            } => Some((*next_poll_at).min(*started_at + self.config.max_run)),
        }
    }

    /// Advance the state machine to `now`.
    ///
    /// Ends the run once `max_run` has elapsed, otherwise runs a round if one
    /// is due and schedules the next one.
    pub fn tick(&mut self, session: &mut Session, now: PtTime) -> Option<RoundReport> {
        let (owner, started_at, next_poll_at, rounds) = match &self.state {
            MonitorState::Idle => return None,
            MonitorState::Polling {
                owner,
                started_at,
                next_poll_at,
                rounds,
            } => (owner.clone(), *started_at, *next_poll_at, *rounds),
        };

        if now - started_at >= self.config.max_run {
            info!("run for {} reached its time budget", owner);
            self.stop();
            return None;
        }

        if now < next_poll_at {
            return None;
        }

        let mut report = self.poll_round(session, &owner, now);
        report.round = rounds + 1;

        self.state = MonitorState::Polling {
            owner,
            started_at,
            next_poll_at: now + self.config.poll_interval,
            rounds: rounds + 1,
        };

        Some(report)
    }

    /// Poll every peer of `owner` once and feed the results through the
    /// recorder and the owner's ledger.
    ///
    /// Independent of the state machine, so a single refresh works while idle.
    pub fn poll_round(&mut self, session: &mut Session, owner: &str, now: PtTime) -> RoundReport {
        let peers: Vec<PeerId> = session
            .owners
            .peers(owner)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        let policy = self.config.first_observation;
        let ledger = session.ledger_mut(owner);
        let mut report = RoundReport::new(owner, now);
        report.polled = peers.len();

        for peer_id in peers {
            let info = match self.client.fetch(&peer_id) {
                Some(info) => info,
                None => {
                    debug!("{}: no data for {}, skipped", owner, peer_id);
                    report.skipped.push(peer_id);
                    continue;
                }
            };
            report.fetched += 1;

            let change = ledger.observe(&peer_id, info, now, policy);
            let old_score = match change.baseline {
                Some(old) => old,
                None => continue,
            };

            match self.recorder.record_if_increased(
                owner,
                &peer_id,
                old_score,
                change.current,
                change.reward,
                now,
            ) {
                Ok(true) => report.wins.push(WinDelta {
                    peer_id,
                    old_score,
                    new_score: change.current,
                    recorded: true,
                }),
                Ok(false) => {}
                Err(e) => {
                    warn!("{}: could not record win of {}: {}", owner, peer_id, e);
                    report.sink_failures += 1;
                    report.wins.push(WinDelta {
                        peer_id,
                        old_score,
                        new_score: change.current,
                        recorded: false,
                    });
                }
            }
        }

        info!(
            "{}: {}/{} peers fetched, {} wins, {} skipped",
            owner,
            report.fetched,
            report.polled,
            report.wins.len(),
            report.skipped.len()
        );

        report
    }
}
