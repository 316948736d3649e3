//! Team snapshots from match timelines
//!
//! Timeline frames are one minute apart, so frame index = minute.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::constants::SNAPSHOT_MINUTES;
use crate::types::{CanonicalParticipant, TeamSnapshot};

/// Per-team snapshots at each configured minute, keyed by team id.
///
/// A participant counts only when gold, xp and level are all present in the
/// frame; a team with no counted participant gets no snapshot for that minute.
pub fn team_snapshots(
    timeline: &Value,
    participants: &[CanonicalParticipant],
) -> BTreeMap<i64, Vec<TeamSnapshot>> {
    let mut out: BTreeMap<i64, Vec<TeamSnapshot>> = BTreeMap::new();
    let frames = timeline
        .pointer("/info/frames")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut rosters: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for p in participants {
        if p.participant_id > 0 {
            rosters.entry(p.team_id).or_default().push(p.participant_id);
        }
    }

    for minute in SNAPSHOT_MINUTES {
        let Some(frame_participants) = frames.get(minute).and_then(|f| f.get("participantFrames")) else {
            continue;
        };
        for (team_id, roster) in &rosters {
            if let Some(snapshot) = team_snapshot(frame_participants, minute, roster) {
                out.entry(*team_id).or_default().push(snapshot);
            }
        }
    }
    out
}

fn team_snapshot(frame_participants: &Value, minute: usize, roster: &[i64]) -> Option<TeamSnapshot> {
    let mut snapshot = TeamSnapshot {
        minute,
        total_gold: 0,
        xp: 0,
        creep_score: 0,
        level_sum: 0,
        participants: 0,
    };
    for pid in roster {
        let Some(frame) = frame_participants.get(pid.to_string().as_str()) else {
            continue;
        };
        let (Some(gold), Some(xp), Some(level)) = (
            finite_i64(frame.get("totalGold")),
            finite_i64(frame.get("xp")),
            finite_i64(frame.get("level")),
        ) else {
            continue;
        };
        let cs = finite_i64(frame.get("minionsKilled"))
            .unwrap_or(0)
            .saturating_add(finite_i64(frame.get("jungleMinionsKilled")).unwrap_or(0));
        snapshot.total_gold = snapshot.total_gold.saturating_add(gold);
        snapshot.xp = snapshot.xp.saturating_add(xp);
        snapshot.level_sum = snapshot.level_sum.saturating_add(level);
        snapshot.creep_score = snapshot.creep_score.saturating_add(cs);
        snapshot.participants += 1;
    }
    (snapshot.participants > 0).then_some(snapshot)
}

fn finite_i64(value: Option<&Value>) -> Option<i64> {
    let v = value?;
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::tests::sample_match;
    use crate::pipeline::processing::normalize::{MatchNormalizer, Normalizer};
    use serde_json::json;

    fn timeline_with_frames(count: usize) -> Value {
        let frames: Vec<Value> = (0..count)
            .map(|minute| {
                let mut pf = serde_json::Map::new();
                for pid in 1..=10 {
                    // participant 10 has no level at any minute
                    let level = if pid == 10 { Value::Null } else { json!(minute / 2 + 1) };
                    pf.insert(
                        pid.to_string(),
                        json!({
                            "totalGold": 500 + minute * 300,
                            "xp": minute * 400,
                            "level": level,
                            "minionsKilled": minute * 7,
                            "jungleMinionsKilled": 1
                        }),
                    );
                }
                json!({ "participantFrames": pf })
            })
            .collect();
        json!({ "info": { "frames": frames } })
    }

    #[test]
    fn test_snapshots_for_both_teams() {
        let raw = sample_match("EUW1_1", 1_000, 420, "14.1.1", json!(true));
        let record = MatchNormalizer
            .normalize(&raw, Some(&timeline_with_frames(20)))
            .unwrap();
        let blue = &record.teams[0].snapshots;
        assert_eq!(blue.len(), 2);
        assert_eq!(blue[0].minute, 10);
        assert_eq!(blue[0].participants, 5);
        assert_eq!(blue[0].total_gold, 5 * 3500);
        assert_eq!(blue[0].creep_score, 5 * 71);
        assert_eq!(blue[1].minute, 15);

        let red = &record.teams[1].snapshots;
        assert_eq!(red[0].participants, 4);
        assert_eq!(red[0].level_sum, 4 * 6);
    }

    #[test]
    fn test_short_timeline_skips_missing_minutes() {
        let raw = sample_match("EUW1_1", 1_000, 420, "14.1.1", json!(true));
        let record = MatchNormalizer
            .normalize(&raw, Some(&timeline_with_frames(12)))
            .unwrap();
        let blue = &record.teams[0].snapshots;
        assert_eq!(blue.len(), 1);
        assert_eq!(blue[0].minute, 10);
    }

    #[test]
    fn test_empty_timeline_yields_nothing() {
        let raw = sample_match("EUW1_1", 1_000, 420, "14.1.1", json!(true));
        let record = MatchNormalizer.normalize(&raw, Some(&json!({}))).unwrap();
        assert!(record.teams.iter().all(|t| t.snapshots.is_empty()));
    }
}
