//! Per-owner record of peer snapshots and last-win times

use hashbrown::HashMap;

use crate::pt_config::FirstObservation;
use crate::pt_interface::{PeerId, PeerInfo, PeerSnapshot, PtTime, Reward, Score};

/// Last snapshot of a peer plus the time its score last went up
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerEntry {
    pub snapshot: PeerSnapshot,
    pub last_win: Option<PtTime>,
}

/// What one observation did to a ledger entry
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreChange {
    /// Score the new one is compared against (see `FirstObservation`)
    pub baseline: Option<Score>,
    pub current: Score,
    pub reward: Reward,
}

impl ScoreChange {
    pub fn increased(&self) -> bool {
        self.baseline.map_or(false, |old| self.current > old)
    }
}

/// In-memory record of each tracked peer's last snapshot and last-win time.
///
/// Entries are created on the first successful poll, updated in place and
/// never removed. `last_win` only moves when the score strictly increases.
#[derive(Debug, Default)]
pub struct WinLedger {
    entries: HashMap<PeerId, LedgerEntry>,
}

impl WinLedger {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, peer_id: &str) -> Option<&LedgerEntry> {
        self.entries.get(peer_id)
    }

    pub fn score_of(&self, peer_id: &str) -> Option<Score> {
        self.entries.get(peer_id).map(|e| e.snapshot.score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Entries ordered by peer id
    pub fn sorted(&self) -> Vec<&LedgerEntry> {
        let mut entries: Vec<&LedgerEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.snapshot.peer_id.cmp(&b.snapshot.peer_id));
        entries
    }

    /// Apply a successful poll result.
    ///
    /// The snapshot is replaced unconditionally; `last_win` is set to `now`
    /// iff the new score is strictly above the baseline.
    pub fn observe(
        &mut self,
        peer_id: &str,
        info: PeerInfo,
        now: PtTime,
        policy: FirstObservation,
    ) -> ScoreChange {
        let previous = self.score_of(peer_id);
        let change = ScoreChange {
            baseline: policy.baseline(previous),
            current: info.score,
            reward: info.reward,
        };
        let won = change.increased();
        let snapshot = PeerSnapshot::from_info(peer_id, info);

        self.entries
            .entry(peer_id.to_string())
            .and_modify(|e| {
                e.snapshot = snapshot.clone();
                if won {
                    e.last_win = Some(now);
                }
            })
            .or_insert_with(|| LedgerEntry {
                snapshot,
                last_win: if won { Some(now) } else { None },
            });

        change
    }
}
