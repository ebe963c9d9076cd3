//! Plain-text views of a ledger: the peer table and the activity lists

use std::fmt::Write;

use crate::pt_interface::format_time;
use crate::pt_ledger::{LedgerEntry, WinLedger};
use crate::pt_monitor::RoundReport;
use crate::pt_recorder::ChangeRecorder;

const TABLE_HEADER: [&str; 5] = ["Peer Name", "Wins", "Reward", "Last Win", "Peer ID"];

fn last_win(entry: &LedgerEntry) -> String {
    entry
        .last_win
        .map(|t| format_time(&t))
        .unwrap_or_else(|| "-".to_string())
}

/// Table of name / wins / reward / last win / peer id, ordered by peer id
pub fn peer_table(ledger: &WinLedger) -> String {
    let rows: Vec<[String; 5]> = ledger
        .sorted()
        .into_iter()
        .map(|e| {
            [
                e.snapshot.name.clone(),
                e.snapshot.score.to_string(),
                format!("{:.2}", e.snapshot.reward),
                last_win(e),
                e.snapshot.peer_id.clone(),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADER.map(|h| h.len());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = TABLE_HEADER.iter().map(|h| h.to_string()).collect();
    write_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&mut out, &rule, &widths);
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    out
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

/// Titled bullet list; an empty list prints `(none)`
pub fn activity_list(title: &str, entries: &[&LedgerEntry]) -> String {
    let mut out = format!("{} ({})\n", title, entries.len());
    if entries.is_empty() {
        out.push_str("  (none)\n");
    }
    for e in entries {
        let _ = writeln!(
            out,
            "  {} [{}] wins={} last win: {}",
            e.snapshot.name,
            e.snapshot.peer_id,
            e.snapshot.score,
            last_win(e)
        );
    }
    out
}

/// One-line summary of a poll round
pub fn round_line(report: &RoundReport) -> String {
    let mut line = format!(
        "round {} at {}: {}/{} fetched, {} wins",
        report.round,
        format_time(&report.time),
        report.fetched,
        report.polled,
        report.wins.len()
    );
    for win in &report.wins {
        let _ = write!(line, " [{} {}->{}]", win.peer_id, win.old_score, win.new_score);
    }
    if !report.skipped.is_empty() {
        let _ = write!(line, ", skipped: {}", report.skipped.join(" "));
    }
    if report.sink_failures > 0 {
        let _ = write!(line, ", {} NOT RECORDED", report.sink_failures);
    }
    line
}

/// Totals of a recorder over a whole run
pub fn recorder_line(recorder: &ChangeRecorder) -> String {
    let mut line = format!("{} win events recorded", recorder.emitted());
    if recorder.failed() > 0 {
        let _ = write!(line, ", {} lost to sink failures", recorder.failed());
    }
    line
}

pub fn status_line(total_owners: usize) -> String {
    format!("Total Users: {}", total_owners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pt_config::FirstObservation;
    use crate::pt_interface::PeerInfo;
    use crate::pt_monitor::WinDelta;
    use crate::pt_sinks::tests::FailingSink;
    use crate::pt_sinks::MemoryWinSink;
    use chrono::{TimeZone, Utc};

    fn ledger() -> WinLedger {
        let mut ledger = WinLedger::new();
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let peers = [("QmB", "slow-grey-mole", 0, 0.0), ("QmA", "fast-gold-hawk", 12, 1234.5)];
        for (id, name, score, reward) in peers {
            let info = PeerInfo {
                name: name.to_string(),
                score,
                reward,
            };
            ledger.observe(id, info, t, FirstObservation::CountFromZero);
        }
        ledger
    }

    #[test]
    fn test_peer_table_layout() {
        let table = peer_table(&ledger());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Peer Name"));
        assert!(lines[1].starts_with("---"));
        // sorted by peer id
        assert!(lines[2].starts_with("fast-gold-hawk"));
        assert!(lines[2].contains("1234.50"));
        assert!(lines[2].contains("2024-05-01T10:00:00Z"));
        assert!(lines[3].starts_with("slow-grey-mole"));
        assert!(lines[3].ends_with("QmB"));
    }

    #[test]
    fn test_activity_list() {
        let ledger = ledger();
        let entries = ledger.sorted();
        let text = activity_list("Active in last hour", &entries[..1]);
        assert!(text.starts_with("Active in last hour (1)"));
        assert!(text.contains("fast-gold-hawk [QmA] wins=12"));

        let empty = activity_list("Inactive for 2 hours", &[]);
        assert!(empty.contains("(none)"));
    }

    #[test]
    fn test_round_line() {
        let report = RoundReport {
            owner: "alice".to_string(),
            time: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            round: 2,
            polled: 3,
            fetched: 2,
            skipped: vec!["QmC".to_string()],
            wins: vec![WinDelta {
                peer_id: "QmA".to_string(),
                old_score: 1,
                new_score: 2,
                recorded: true,
            }],
            sink_failures: 0,
        };
        assert_eq!(
            round_line(&report),
            "round 2 at 2024-05-01T10:00:00Z: 2/3 fetched, 1 wins [QmA 1->2], skipped: QmC"
        );
        assert_eq!(status_line(4), "Total Users: 4");
    }

    #[test]
    fn test_recorder_line() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut recorder = ChangeRecorder::new(Box::new(MemoryWinSink::new()));
        assert_eq!(recorder_line(&recorder), "0 win events recorded");

        recorder.record_if_increased("alice", "QmA", 0, 2, 0.0, t).unwrap();
        recorder.record_if_increased("alice", "QmA", 2, 2, 0.0, t).unwrap();
        assert_eq!(recorder_line(&recorder), "1 win events recorded");

        let mut failing = ChangeRecorder::new(Box::new(FailingSink));
        assert!(failing.record_if_increased("bob", "QmB", 1, 3, 0.0, t).is_err());
        assert_eq!(recorder_line(&failing), "0 win events recorded, 1 lost to sink failures");
    }
}
