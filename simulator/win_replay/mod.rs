// Win Replay Simulator
//
// Replays scripted peer score histories through the real Monitor, recorder
// and classifier, without network access.

pub mod client;
pub mod config;
pub mod runner;

pub use config::ScenarioFile;
pub use runner::ReplayRunner;
