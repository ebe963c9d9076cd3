// Win Replay Scenario Configuration

use pt_rust::pt_config::{seconds, FirstObservation};
use pt_rust::pt_interface::{PeerId, Score};
use pt_rust::MonitorConfig;
use std::collections::BTreeMap;

/// Scenario file format
#[derive(Debug, serde::Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub meta: ScenarioMeta,

    #[serde(default)]
    pub config: ReplayConfig,

    /// Owner label -> space separated peer ids, as typed into the dashboard
    pub owners: BTreeMap<String, String>,

    /// Peer id -> score per round; the last value repeats, `~` means the
    /// endpoint fails that round
    pub peers: BTreeMap<PeerId, Vec<Option<Score>>>,

    #[serde(default)]
    pub expect: Expectations,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ScenarioMeta {
    pub name: Option<String>,
    pub description: Option<String>,
    pub hypothesis: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub poll_interval_secs: u64,
    pub max_run_secs: u64,
    pub active_window_secs: u64,
    pub stale_window_secs: u64,
    pub first_observation: FirstObservation,

    /// Probability that any single fetch fails on top of the script
    pub failure_rate: f64,

    /// Reward reported per win
    pub reward_per_win: f64,

    /// Export recorded events to this CSV file
    pub csv_export: Option<String>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            max_run_secs: 600,
            active_window_secs: 180,
            stale_window_secs: 360,
            first_observation: FirstObservation::CountFromZero,
            failure_rate: 0.0,
            reward_per_win: 10.0,
            csv_export: None,
        }
    }
}

impl ReplayConfig {
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: seconds(self.poll_interval_secs.max(1)),
            max_run: seconds(self.max_run_secs.max(1)),
            first_observation: self.first_observation,
        }
    }
}

/// Checked after the run; missing fields are not checked
#[derive(Debug, Default, serde::Deserialize)]
pub struct Expectations {
    pub total_wins: Option<usize>,
    pub active: Option<Vec<PeerId>>,
    pub stale: Option<Vec<PeerId>>,
}
