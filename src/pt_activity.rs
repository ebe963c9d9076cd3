//! Activity classification
//!
//! Splits a ledger at the cutoff `now - window`: a peer is recently active
//! when its last win is strictly after the cutoff, stale otherwise (including
//! peers that never won). The two sets partition the ledger exactly.

use chrono::Duration;

use crate::pt_interface::PtTime;
use crate::pt_ledger::{LedgerEntry, WinLedger};

pub fn cutoff(now: PtTime, window: Duration) -> PtTime {
    now - window
}

pub fn is_recently_active(entry: &LedgerEntry, cutoff: PtTime) -> bool {
    entry.last_win.map_or(false, |last_win| last_win > cutoff)
}

/// Peers that won strictly after `now - window`, ordered by peer id
pub fn recently_active(ledger: &WinLedger, now: PtTime, window: Duration) -> Vec<&LedgerEntry> {
    classify(ledger, now, window).active
}

/// Peers without a win after `now - window`, ordered by peer id
pub fn stale(ledger: &WinLedger, now: PtTime, window: Duration) -> Vec<&LedgerEntry> {
    classify(ledger, now, window).stale
}

#[derive(Debug, Default)]
pub struct ActivityReport<'a> {
    pub cutoff: Option<PtTime>,
    pub active: Vec<&'a LedgerEntry>,
    pub stale: Vec<&'a LedgerEntry>,
}

pub fn classify(ledger: &WinLedger, now: PtTime, window: Duration) -> ActivityReport<'_> {
    let cutoff = cutoff(now, window);
    let (active, stale): (Vec<&LedgerEntry>, Vec<&LedgerEntry>) = ledger
        .sorted()
        .into_iter()
        .partition(|entry| is_recently_active(entry, cutoff));

    ActivityReport {
        cutoff: Some(cutoff),
        active,
        stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pt_config::FirstObservation;
    use crate::pt_interface::PeerInfo;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn t0() -> PtTime {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn observe(ledger: &mut WinLedger, peer_id: &str, score: u64, at: PtTime) {
        let info = PeerInfo {
            name: peer_id.to_string(),
            score,
            reward: 0.0,
        };
        ledger.observe(peer_id, info, at, FirstObservation::CountFromZero);
    }

    fn ids(entries: &[&LedgerEntry]) -> Vec<String> {
        entries.iter().map(|e| e.snapshot.peer_id.clone()).collect()
    }

    #[test]
    fn test_p1_goes_stale_after_two_hours() {
        let mut ledger = WinLedger::new();
        observe(&mut ledger, "p1", 0, t0());
        let ts = t0() + Duration::minutes(5);
        observe(&mut ledger, "p1", 3, ts);

        let now = ts + Duration::hours(2);
        let window = Duration::hours(2);
        assert!(ids(&stale(&ledger, now, window)).contains(&"p1".to_string()));
        assert!(recently_active(&ledger, now, window).is_empty());

        // one second earlier the win is still inside the window
        let earlier = now - Duration::seconds(1);
        assert_eq!(ids(&recently_active(&ledger, earlier, window)), vec!["p1"]);
    }

    #[test]
    fn test_never_won_is_stale() {
        let mut ledger = WinLedger::new();
        observe(&mut ledger, "p1", 0, t0());
        let report = classify(&ledger, t0(), Duration::hours(1));
        assert!(report.active.is_empty());
        assert_eq!(ids(&report.stale), vec!["p1"]);
        assert_eq!(report.cutoff, Some(t0() - Duration::hours(1)));
    }

    #[test]
    fn test_zero_window_puts_everything_in_stale() {
        let mut ledger = WinLedger::new();
        observe(&mut ledger, "p1", 1, t0());
        // cutoff == last_win is not strictly after
        let report = classify(&ledger, t0(), Duration::zero());
        assert!(report.active.is_empty());
        assert_eq!(report.stale.len(), 1);
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = WinLedger::new();
        let report = classify(&ledger, t0(), Duration::hours(1));
        assert!(report.active.is_empty());
        assert!(report.stale.is_empty());
    }

    #[test]
    fn test_sets_partition_the_ledger() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut ledger = WinLedger::new();

        for i in 0..60 {
            let peer_id = format!("p{:02}", i);
            observe(&mut ledger, &peer_id, 0, t0());
            // some peers never win, the rest win at random minutes
            if rng.gen_bool(0.7) {
                let at = t0() + Duration::minutes(rng.gen_range(1..240));
                observe(&mut ledger, &peer_id, rng.gen_range(1..50), at);
            }
        }

        let now = t0() + Duration::hours(4);
        for window_minutes in [0, 1, 30, 60, 119, 120, 121, 239, 240, 241, 10_000] {
            let window = Duration::minutes(window_minutes);
            let active_ids: HashSet<String> =
                ids(&recently_active(&ledger, now, window)).into_iter().collect();
            let stale_ids: HashSet<String> = ids(&stale(&ledger, now, window)).into_iter().collect();

            assert!(active_ids.is_disjoint(&stale_ids), "overlap for window {}", window_minutes);
            assert_eq!(active_ids.len() + stale_ids.len(), ledger.len());
            for entry in ledger.iter() {
                let id = &entry.snapshot.peer_id;
                assert!(active_ids.contains(id) || stale_ids.contains(id));
            }
        }
    }
}
