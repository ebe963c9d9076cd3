//! # ptRust - Peer Win Tracker
//!
//! Polls a peer status endpoint for a set of peer identifiers, detects win
//! events (strict increases of a peer's cumulative score between two polls),
//! appends them to an append-only sink and classifies peers by the time of
//! their last win.
//!
//! ## Core Components
//!
//! - **Monitor**: Idle/Polling state machine running poll rounds for one owner
//! - **WinLedger**: last snapshot and last-win time of every polled peer
//! - **ChangeRecorder**: turns score increases into `WinEvent` rows on a sink
//! - **Activity**: recently active / stale partition of a ledger
//! - **PollingHandle**: cancellable background thread driving a Monitor
//!
//! ## Usage
//!
//! All state lives in a caller-owned `Session`. Drive the monitor yourself
//! with `tick()` or hand it to `pt_scheduler::spawn`:
//!
//! ```no_run
//! use pt_rust::{HttpPeerClient, Monitor, MonitorConfig, Session};
//! use pt_rust::pt_sinks::CsvWinSink;
//! use pt_rust::pt_scheduler;
//! use std::time::Duration;
//!
//! let client = HttpPeerClient::new(pt_rust::pt_client::DEFAULT_ENDPOINT, Duration::from_secs(10))?;
//! let sink = CsvWinSink::open("wins.csv")?;
//!
//! let mut session = Session::default();
//! session.owners.add_peers_text("alice", "QmPeerA QmPeerB");
//!
//! let mut monitor = Monitor::new(Box::new(client), Box::new(sink), MonitorConfig::default());
//! monitor.start(&session, "alice", chrono::Utc::now())?;
//!
//! let handle = pt_scheduler::spawn(monitor, session);
//! // ... later
//! let (_monitor, session) = handle.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod pt_activity;
pub mod pt_client;
pub mod pt_config;
pub mod pt_interface;
pub mod pt_ledger;
pub mod pt_monitor;
pub mod pt_owners;
pub mod pt_recorder;
pub mod pt_report;
pub mod pt_scheduler;
pub mod pt_session;
pub mod pt_sinks;

// Re-export commonly used types
pub use pt_client::HttpPeerClient;
pub use pt_config::{FirstObservation, TrackerConfig};
pub use pt_interface::{
    Owner, PeerId, PeerInfo, PeerInfoClient, PeerSnapshot, PtTime, Score, WinEvent, WinEventSink,
};
pub use pt_ledger::{LedgerEntry, WinLedger};
pub use pt_monitor::{Monitor, MonitorConfig, MonitorError, MonitorState, RoundReport};
pub use pt_owners::OwnerBook;
pub use pt_recorder::ChangeRecorder;
pub use pt_session::Session;
