//! Background polling
//!
//! Runs a started `Monitor` on its own thread. The thread ticks the monitor,
//! then waits on a stop channel until the monitor's next deadline, so a stop
//! request interrupts the wait instead of sitting out the remaining interval.
//! Monitor and session are moved into the thread and handed back on
//! `stop()`/`join()`; nothing is shared while polling runs.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use log::debug;

use crate::pt_monitor::{Monitor, RoundReport};
use crate::pt_session::Session;

/// Handle to a polling thread; dropping it cancels the run
pub struct PollingHandle {
    stop_tx: Sender<()>,
    reports: Receiver<RoundReport>,
    worker: JoinHandle<(Monitor, Session)>,
}

/// Block until `input` yields a line, the operator's stop request.
///
/// End of input and read errors return false: a closed stdin (cron, nohup,
/// `< /dev/null`) must never cancel a run.
pub fn read_stop_line<R: BufRead>(mut input: R) -> bool {
    let mut line = String::new();
    matches!(input.read_line(&mut line), Ok(n) if n > 0)
}

/// Move `monitor` and `session` onto a polling thread.
///
/// The monitor is expected to be started already; an idle monitor makes the
/// thread return at once.
pub fn spawn(monitor: Monitor, session: Session) -> PollingHandle {
    let (stop_tx, stop_rx) = mpsc::channel();
    let (report_tx, reports) = mpsc::channel();

    let worker = thread::spawn(move || run(monitor, session, stop_rx, report_tx));

    PollingHandle {
        stop_tx,
        reports,
        worker,
    }
}

fn run(
    mut monitor: Monitor,
    mut session: Session,
    stop_rx: Receiver<()>,
    report_tx: Sender<RoundReport>,
) -> (Monitor, Session) {
    loop {
        if let Some(report) = monitor.tick(&mut session, Utc::now()) {
            // a receiver that went away does not stop polling
            let _ = report_tx.send(report);
        }

        let deadline = match monitor.next_deadline() {
            Some(deadline) => deadline,
            None => break,
        };

        let wait = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("stop requested");
                monitor.stop();
                break;
            }
        }
    }

    (monitor, session)
}

impl PollingHandle {
    /// Next report if one is waiting
    pub fn try_report(&self) -> Option<RoundReport> {
        match self.reports.try_recv() {
            Ok(report) => Some(report),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next report
    pub fn report_timeout(&self, timeout: Duration) -> Option<RoundReport> {
        self.reports.recv_timeout(timeout).ok()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Cancel the run and take monitor and session back
    pub fn stop(self) -> (Monitor, Session) {
        let _ = self.stop_tx.send(());
        self.join()
    }

    /// Wait for the run to end on its own (time budget reached)
    pub fn join(self) -> (Monitor, Session) {
        let PollingHandle {
            stop_tx, worker, ..
        } = self;
        let result = worker.join();
        drop(stop_tx);
        match result {
            Ok(state) => state,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pt_config::FirstObservation;
    use crate::pt_monitor::tests::TableClient;
    use crate::pt_monitor::MonitorConfig;
    use crate::pt_sinks::MemoryWinSink;
    use std::io::{self, Cursor, Read};
    use std::time::Instant;

    struct BrokenInput;

    impl Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "terminal gone"))
        }
    }

    #[test]
    fn test_stop_line_needs_actual_input() {
        assert!(read_stop_line(Cursor::new("\n")));
        assert!(read_stop_line(Cursor::new("stop\n")));
        assert!(read_stop_line(Cursor::new("q")));

        // closed stdin is not a stop request
        assert!(!read_stop_line(Cursor::new("")));
        assert!(!read_stop_line(io::BufReader::new(BrokenInput)));
    }

    fn monitor(client: &TableClient, sink: &MemoryWinSink, interval_ms: i64, max_run_ms: i64) -> Monitor {
        let config = MonitorConfig {
            poll_interval: chrono::Duration::milliseconds(interval_ms),
            max_run: chrono::Duration::milliseconds(max_run_ms),
            first_observation: FirstObservation::CountFromZero,
        };
        Monitor::new(Box::new(client.clone()), Box::new(sink.clone()), config)
    }

    fn session() -> Session {
        let mut session = Session::default();
        session.owners.add_peers_text("alice", "p1 p2");
        session
    }

    #[test]
    fn test_stop_interrupts_wait() {
        let client = TableClient::default();
        client.set("p1", 1, 0.0);
        let sink = MemoryWinSink::new();
        let session = session();
        let mut monitor = monitor(&client, &sink, 60_000, 600_000);
        monitor.start(&session, "alice", Utc::now()).unwrap();

        let handle = spawn(monitor, session);
        let first = handle.report_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.round, 1);
        assert_eq!(first.skipped, vec!["p2".to_string()]);

        // the thread now waits a full minute for the next round
        let started = Instant::now();
        let (monitor, session) = handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!monitor.is_polling());
        assert_eq!(session.ledger("alice").unwrap().score_of("p1"), Some(1));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_run_ends_on_time_budget() {
        let client = TableClient::default();
        client.set("p1", 1, 0.0);
        client.set("p2", 1, 0.0);
        let sink = MemoryWinSink::new();
        let session = session();
        let mut monitor = monitor(&client, &sink, 20, 150);
        monitor.start(&session, "alice", Utc::now()).unwrap();

        let handle = spawn(monitor, session);
        let (monitor, _session) = handle.join();
        assert!(!monitor.is_polling());
        // two first-sight wins, then an unchanged remote state
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_reports_stream_each_round() {
        let client = TableClient::default();
        client.set("p1", 1, 0.0);
        let sink = MemoryWinSink::new();
        let session = session();
        let mut monitor = monitor(&client, &sink, 10, 200);
        monitor.start(&session, "alice", Utc::now()).unwrap();

        let handle = spawn(monitor, session);
        let first = handle.report_timeout(Duration::from_secs(5)).unwrap();
        client.set("p1", 2, 0.0);
        let mut last = first.round;
        let mut won_again = false;
        while let Some(report) = handle.report_timeout(Duration::from_secs(5)) {
            assert!(report.round > last);
            last = report.round;
            won_again |= report.wins.iter().any(|w| w.old_score == 1 && w.new_score == 2);
        }
        assert!(won_again);
        let (monitor, _session) = handle.join();
        assert!(!monitor.is_polling());
    }

    #[test]
    fn test_idle_monitor_returns_immediately() {
        let client = TableClient::default();
        let sink = MemoryWinSink::new();
        let handle = spawn(monitor(&client, &sink, 10, 100), session());
        let (monitor, session) = handle.join();
        assert!(!monitor.is_polling());
        assert!(session.ledger("alice").is_none());
    }
}
