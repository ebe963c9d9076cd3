use chrono::{DateTime, SecondsFormat, Utc};

use crate::pt_sinks::SinkError;

// opaque identifiers handed out by the remote dashboard
pub type PeerId = String;
pub type Owner = String;

/// Cumulative win count reported as `score` by the endpoint
pub type Score = u64;
pub type Reward = f64;

pub type PtTime = DateTime<Utc>;

/// Display name used when the endpoint omits `peerName`
pub const UNKNOWN_PEER_NAME: &str = "N/A";

/// Column order of a win event row in every sink
pub const WIN_EVENT_COLUMNS: [&str; 6] = [
    "owner",
    "peer_id",
    "old_score",
    "new_score",
    "reward",
    "timestamp",
];

/// Result of one successful fetch from the remote endpoint
#[derive(Clone, Debug, PartialEq)]
pub struct PeerInfo {
    pub name: String,
    pub score: Score,
    pub reward: Reward,
}

/// Last known state of a peer
#[derive(Clone, Debug, PartialEq)]
pub struct PeerSnapshot {
    pub peer_id: PeerId,
    pub name: String,
    pub score: Score,
    pub reward: Reward,
}

impl PeerSnapshot {
    pub fn from_info(peer_id: &str, info: PeerInfo) -> Self {
        Self {
            peer_id: peer_id.to_string(),
            name: info.name,
            score: info.score,
            reward: info.reward,
        }
    }
}

/// A strict increase of a peer's score between two consecutive polls.
///
/// Immutable once appended to a sink.
#[derive(Clone, Debug, PartialEq)]
pub struct WinEvent {
    pub owner: Owner,
    pub peer_id: PeerId,
    pub old_score: Score,
    pub new_score: Score,
    pub reward: Reward,
    pub time: PtTime,
}

impl WinEvent {
    /// Cells in `WIN_EVENT_COLUMNS` order, timestamp as RFC 3339 (UTC)
    pub fn to_row(&self) -> [String; 6] {
        [
            self.owner.clone(),
            self.peer_id.clone(),
            self.old_score.to_string(),
            self.new_score.to_string(),
            self.reward.to_string(),
            format_time(&self.time),
        ]
    }
}

pub fn format_time(time: &PtTime) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// Seams
// ============================================================================

/// Source of current peer status.
///
/// Absence means "skip this peer this round", never a fatal condition.
pub trait PeerInfoClient {
    fn fetch(&self, peer_id: &str) -> Option<PeerInfo>;
}

/// Append-only destination for win events
pub trait WinEventSink {
    fn append(&mut self, event: &WinEvent) -> Result<(), SinkError>;
}

impl<T: PeerInfoClient + ?Sized> PeerInfoClient for Box<T> {
    fn fetch(&self, peer_id: &str) -> Option<PeerInfo> {
        (**self).fetch(peer_id)
    }
}

impl<T: WinEventSink + ?Sized> WinEventSink for Box<T> {
    fn append(&mut self, event: &WinEvent) -> Result<(), SinkError> {
        (**self).append(event)
    }
}
