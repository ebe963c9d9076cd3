//! Win event emission on strict score increases

use crate::pt_interface::{PtTime, Reward, Score, WinEvent, WinEventSink};
use crate::pt_sinks::SinkError;

/// Turns score changes into win events on an append-only sink
pub struct ChangeRecorder {
    sink: Box<dyn WinEventSink + Send>,
    emitted: usize,
    failed: usize,
}

impl ChangeRecorder {
    pub fn new(sink: Box<dyn WinEventSink + Send>) -> Self {
        Self {
            sink,
            emitted: 0,
            failed: 0,
        }
    }

    /// Append a win event iff `new_score > old_score`.
    ///
    /// Returns whether an event was emitted. A sink failure is returned to the
    /// caller and counted; nothing is retried.
    pub fn record_if_increased(
        &mut self,
        owner: &str,
        peer_id: &str,
        old_score: Score,
        new_score: Score,
        reward: Reward,
        now: PtTime,
    ) -> Result<bool, SinkError> {
        if new_score <= old_score {
            return Ok(false);
        }

        let event = WinEvent {
            owner: owner.to_string(),
            peer_id: peer_id.to_string(),
            old_score,
            new_score,
            reward,
            time: now,
        };

        match self.sink.append(&event) {
            Ok(()) => {
                self.emitted += 1;
                Ok(true)
            }
            Err(e) => {
                self.failed += 1;
                Err(e)
            }
        }
    }

    /// Events successfully appended so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Appends rejected by the sink so far
    pub fn failed(&self) -> usize {
        self.failed
    }
}
