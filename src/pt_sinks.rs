//! Win event sinks
//!
//! Every sink is append-only: rows are written in the order events happen and
//! never rewritten.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::info;
use thiserror::Error;

use crate::pt_interface::{WinEvent, WinEventSink, WIN_EVENT_COLUMNS};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink unavailable: {0}")]
    Unavailable(String),

    #[error("{failed} of {total} sinks failed, first: {first}")]
    Partial {
        failed: usize,
        total: usize,
        first: Box<SinkError>,
    },
}

// ============================================================================
// CSV File Sink
// ============================================================================

/// Appends one CSV row per event; the header is written when the file is new
pub struct CsvWinSink {
    writer: BufWriter<File>,
}

impl CsvWinSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_new = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);

        if is_new {
            writeln!(writer, "{}", WIN_EVENT_COLUMNS.join(","))?;
            writer.flush()?;
        }

        Ok(Self { writer })
    }
}

/// Quote a cell if it contains a separator, quote or line break
fn csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

impl WinEventSink for CsvWinSink {
    fn append(&mut self, event: &WinEvent) -> Result<(), SinkError> {
        let row: Vec<String> = event.to_row().iter().map(|c| csv_cell(c)).collect();
        writeln!(self.writer, "{}", row.join(","))?;
        // each row must be durable before the next poll
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// Memory Sink
// ============================================================================

/// Collects events in memory; clones share the same buffer
#[derive(Clone, Default)]
pub struct MemoryWinSink {
    events: Arc<Mutex<Vec<WinEvent>>>,
}

impl MemoryWinSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WinEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WinEventSink for MemoryWinSink {
    fn append(&mut self, event: &WinEvent) -> Result<(), SinkError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| SinkError::Unavailable("memory sink poisoned".to_string()))?;
        events.push(event.clone());
        Ok(())
    }
}

// ============================================================================
// Log Sink
// ============================================================================

pub struct LogWinSink;

impl WinEventSink for LogWinSink {
    fn append(&mut self, event: &WinEvent) -> Result<(), SinkError> {
        info!(
            "win: owner={} peer={} {} -> {} reward={}",
            event.owner, event.peer_id, event.old_score, event.new_score, event.reward
        );
        Ok(())
    }
}

// ============================================================================
// Multi Sink
// ============================================================================

/// Fans an event out to several sinks.
///
/// Every sink gets the event even if an earlier one failed.
#[derive(Default)]
pub struct MultiWinSink {
    sinks: Vec<Box<dyn WinEventSink + Send>>,
}

impl MultiWinSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn WinEventSink + Send>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl WinEventSink for MultiWinSink {
    fn append(&mut self, event: &WinEvent) -> Result<(), SinkError> {
        let total = self.sinks.len();
        let mut failed = 0;
        let mut first = None;

        for sink in &mut self.sinks {
            if let Err(e) = sink.append(event) {
                failed += 1;
                first.get_or_insert(e);
            }
        }

        match first {
            None => Ok(()),
            Some(first) => Err(SinkError::Partial {
                failed,
                total,
                first: Box::new(first),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::fs;

    /// Sink that rejects every append
    pub(crate) struct FailingSink;

    impl WinEventSink for FailingSink {
        fn append(&mut self, _event: &WinEvent) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("quota exceeded".to_string()))
        }
    }

    fn event(owner: &str, new_score: u64) -> WinEvent {
        WinEvent {
            owner: owner.to_string(),
            peer_id: "QmPeerA".to_string(),
            old_score: 1,
            new_score,
            reward: 2.5,
            time: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_csv_sink_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wins.csv");

        {
            let mut sink = CsvWinSink::open(&path).unwrap();
            sink.append(&event("alice", 2)).unwrap();
        }
        {
            // reopening appends without a second header
            let mut sink = CsvWinSink::open(&path).unwrap();
            sink.append(&event("alice", 3)).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "owner,peer_id,old_score,new_score,reward,timestamp");
        assert_eq!(lines[1], "alice,QmPeerA,1,2,2.5,2024-05-01T08:00:00Z");
        assert_eq!(lines[2], "alice,QmPeerA,1,3,2.5,2024-05-01T08:00:00Z");
    }

    #[test]
    fn test_csv_sink_quotes_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wins.csv");

        let mut sink = CsvWinSink::open(&path).unwrap();
        sink.append(&event("team \"a\", west", 2)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert!(row.starts_with("\"team \"\"a\"\", west\",QmPeerA,"));
    }

    #[test]
    fn test_memory_sink_clones_share_buffer() {
        let sink = MemoryWinSink::new();
        let mut writer = sink.clone();
        writer.append(&event("bob", 4)).unwrap();
        writer.append(&event("bob", 5)).unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].new_score, 5);
    }

    #[test]
    fn test_multi_sink_reaches_all_sinks() {
        let memory = MemoryWinSink::new();
        let mut multi = MultiWinSink::new();
        multi.add_sink(Box::new(FailingSink));
        multi.add_sink(Box::new(memory.clone()));
        multi.add_sink(Box::new(LogWinSink));

        let result = multi.append(&event("carol", 7));
        match result {
            Err(SinkError::Partial { failed, total, .. }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("expected partial failure, got {:?}", other),
        }
        // the sink after the failing one still got the event
        assert_eq!(memory.len(), 1);
    }
}
