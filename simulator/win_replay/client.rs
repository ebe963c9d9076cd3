// Scripted peer client for replays

use pt_rust::pt_interface::{PeerId, PeerInfo, PeerInfoClient, Score};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Answers from per-round score scripts; the runner moves the round cursor
pub struct ScriptedClient {
    scripts: BTreeMap<PeerId, Vec<Option<Score>>>,
    round: Arc<AtomicUsize>,
    rng: Mutex<StdRng>,
    failure_rate: f64,
    reward_per_win: f64,
}

impl ScriptedClient {
    pub fn new(
        scripts: BTreeMap<PeerId, Vec<Option<Score>>>,
        round: Arc<AtomicUsize>,
        rng: StdRng,
        failure_rate: f64,
        reward_per_win: f64,
    ) -> Self {
        Self {
            scripts,
            round,
            rng: Mutex::new(rng),
            failure_rate: failure_rate.clamp(0.0, 1.0),
            reward_per_win,
        }
    }

    fn random_failure(&self) -> bool {
        if self.failure_rate <= 0.0 {
            return false;
        }
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(self.failure_rate),
            Err(_) => false,
        }
    }
}

impl PeerInfoClient for ScriptedClient {
    fn fetch(&self, peer_id: &str) -> Option<PeerInfo> {
        let script = self.scripts.get(peer_id)?;
        let round = self.round.load(Ordering::Relaxed);
        let score = (*script.get(round).or_else(|| script.last())?)?;

        if self.random_failure() {
            return None;
        }

        Some(PeerInfo {
            name: format!("sim-{}", peer_id),
            score,
            reward: score as f64 * self.reward_per_win,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_script_cursor_and_gaps() {
        let mut scripts = BTreeMap::new();
        scripts.insert("p1".to_string(), vec![Some(0), None, Some(2)]);
        let round = Arc::new(AtomicUsize::new(0));
        let client = ScriptedClient::new(scripts, round.clone(), StdRng::seed_from_u64(1), 0.0, 5.0);

        assert_eq!(client.fetch("p1").unwrap().score, 0);
        round.store(1, Ordering::Relaxed);
        assert!(client.fetch("p1").is_none());
        round.store(7, Ordering::Relaxed);
        let info = client.fetch("p1").unwrap();
        assert_eq!(info.score, 2);
        assert_eq!(info.reward, 10.0);
        assert!(client.fetch("unknown").is_none());
    }
}
