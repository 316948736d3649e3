//! Single-pass streaming aggregation over the canonical record store
//!
//! Memory is bounded by the number of distinct keys per dimension: the
//! compact index is handed to a sink entry by entry instead of being kept.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead};
use tracing::{debug, warn};

use crate::constants::{BLUE_TEAM_ID, RED_TEAM_ID, UNKNOWN_PATCH};
use crate::types::{
    CanonicalRecord, ChampionRow, CompactIndexEntry, DayRow, PatchRow, QueueRow, RunMetadata,
    TimeRange,
};

pub mod bucket;

use bucket::{ChampionBucket, RollupBucket};

/// Snapshot datasets produced at end of stream
#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub metadata: RunMetadata,
    pub champions: Vec<ChampionRow>,
    pub queues: Vec<QueueRow>,
    pub patches: Vec<PatchRow>,
    pub days: Vec<DayRow>,
}

#[derive(Debug, Default)]
pub struct StreamingAggregator {
    match_count: u64,
    participant_count: u64,
    dropped_lines: u64,
    first_start: Option<i64>,
    last_end: Option<i64>,
    champions: HashMap<i64, ChampionBucket>,
    queues: HashMap<i64, RollupBucket>,
    patches: HashMap<String, RollupBucket>,
    days: BTreeMap<NaiveDate, RollupBucket>,
}

impl StreamingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    pub fn dropped_lines(&self) -> u64 {
        self.dropped_lines
    }

    /// Fold one record into every dimension and return its index entry.
    pub fn fold(&mut self, record: &CanonicalRecord) -> CompactIndexEntry {
        let blue_win = record.team_won(BLUE_TEAM_ID);
        let red_win = record.team_won(RED_TEAM_ID);
        let total_kills = record.total_kills();

        self.match_count += 1;
        self.observe_time_range(record);

        self.queues
            .entry(record.queue_id)
            .or_default()
            .observe(record, blue_win, total_kills);
        self.patches
            .entry(record.patch.clone())
            .or_default()
            .observe(record, blue_win, total_kills);
        if let Some(day) = utc_day(record.game_start) {
            self.days
                .entry(day)
                .or_default()
                .observe(record, blue_win, total_kills);
        }

        for participant in &record.participants {
            self.participant_count += 1;
            self.champions
                .entry(participant.champion_id)
                .or_default()
                .observe(participant);
        }

        CompactIndexEntry {
            match_id: record.match_id.clone(),
            start: record.game_start,
            queue_id: record.queue_id,
            patch: record.patch.clone(),
            duration: record.duration,
            blue_win,
            red_win,
        }
    }

    /// Count a line that could not be parsed. It affects nothing else.
    pub fn note_dropped(&mut self) {
        self.dropped_lines += 1;
    }

    /// Read newline-delimited records, folding each and passing its index
    /// entry to `sink`. Blank lines are ignored; unparseable lines are dropped.
    pub fn fold_lines<R, F>(&mut self, mut reader: R, mut sink: F) -> io::Result<()>
    where
        R: BufRead,
        F: FnMut(CompactIndexEntry) -> io::Result<()>,
    {
        let mut line = Vec::new();
        let mut line_no: u64 = 0;
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            line_no += 1;
            let trimmed = trim_ascii(&line);
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_slice::<CanonicalRecord>(trimmed) {
                Ok(record) => {
                    crate::metrics::aggregate::line_read();
                    let entry = self.fold(&record);
                    sink(entry)?;
                }
                Err(e) => {
                    crate::metrics::aggregate::line_dropped();
                    warn!(line = line_no, error = %e, "skipping malformed canonical line");
                    self.note_dropped();
                }
            }
        }
        debug!(lines = line_no, matches = self.match_count, "stream consumed");
        Ok(())
    }

    fn observe_time_range(&mut self, record: &CanonicalRecord) {
        if record.game_start > 0 {
            self.first_start = Some(self.first_start.map_or(record.game_start, |s| s.min(record.game_start)));
        }
        let end = if record.game_end > 0 {
            record.game_end
        } else if record.game_start > 0 {
            record
                .game_start
                .saturating_add(record.duration.max(0).saturating_mul(1000))
        } else {
            0
        };
        if end > 0 {
            self.last_end = Some(self.last_end.map_or(end, |e| e.max(end)));
        }
    }

    pub fn finish(self, generated_at: DateTime<Utc>) -> Datasets {
        let mut champions: Vec<ChampionRow> = self
            .champions
            .iter()
            .map(|(id, bucket)| bucket.to_row(*id))
            .collect();
        champions.sort_by(|a, b| {
            b.games
                .cmp(&a.games)
                .then_with(|| a.champion_id.cmp(&b.champion_id))
        });

        let mut queues: Vec<QueueRow> = self
            .queues
            .iter()
            .map(|(queue_id, bucket)| QueueRow {
                queue_id: *queue_id,
                stats: bucket.stats(),
            })
            .collect();
        queues.sort_by_key(|row| row.queue_id);

        let mut patches: Vec<PatchRow> = self
            .patches
            .iter()
            .map(|(patch, bucket)| PatchRow {
                patch: patch.clone(),
                stats: bucket.stats(),
            })
            .collect();
        patches.sort_by(|a, b| patch_sort_key(&a.patch).cmp(&patch_sort_key(&b.patch)));

        let days: Vec<DayRow> = self
            .days
            .iter()
            .map(|(day, bucket)| DayRow {
                date: day.format("%Y-%m-%d").to_string(),
                stats: bucket.stats(),
            })
            .collect();

        let metadata = RunMetadata {
            match_count: self.match_count,
            participant_count: self.participant_count,
            dropped_lines: self.dropped_lines,
            champion_count: champions.len(),
            queue_count: queues.len(),
            patch_count: patches.len(),
            day_count: days.len(),
            time_range: TimeRange {
                start: self.first_start.and_then(iso_millis),
                end: self.last_end.and_then(iso_millis),
            },
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        Datasets {
            metadata,
            champions,
            queues,
            patches,
            days,
        }
    }
}

/// UTC calendar day of an epoch-millisecond timestamp; none for the zero sentinel.
pub fn utc_day(ts_millis: i64) -> Option<NaiveDate> {
    if ts_millis <= 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(ts_millis).map(|dt| dt.date_naive())
}

fn iso_millis(ts_millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ts_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Numeric patches in version order, then anything else, `unknown` last.
fn patch_sort_key(patch: &str) -> (u8, Vec<u64>, String) {
    if patch == UNKNOWN_PATCH {
        return (2, Vec::new(), String::new());
    }
    let numeric: Option<Vec<u64>> = patch.split('.').map(|c| c.parse::<u64>().ok()).collect();
    match numeric {
        Some(parts) => (0, parts, patch.to_string()),
        None => (1, Vec::new(), patch.to_string()),
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &bytes[start..end]
}
