use serde_json::Value;

use crate::constants::UNKNOWN_PATCH;
use crate::types::{CanonicalParticipant, CanonicalRecord, CanonicalTeam, ObjectiveSummary};

pub mod timeline;

const MAX_ITEM_SLOTS: usize = 7;

/// Why a raw payload produced no canonical record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAnObject,
    MissingIdentifier,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NotAnObject => f.write_str("payload is not a JSON object"),
            Rejection::MissingIdentifier => f.write_str("metadata.matchId missing"),
        }
    }
}

/// Trait for normalizing raw match payloads into canonical records
pub trait Normalizer {
    /// Pure transform; persistence is the caller's concern.
    fn normalize(&self, raw: &Value, timeline: Option<&Value>) -> Result<CanonicalRecord, Rejection>;
}

/// Normalizer for match-v5 payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchNormalizer;

impl Normalizer for MatchNormalizer {
    fn normalize(&self, raw: &Value, timeline: Option<&Value>) -> Result<CanonicalRecord, Rejection> {
        if !raw.is_object() {
            return Err(Rejection::NotAnObject);
        }
        let match_id = raw
            .pointer("/metadata/matchId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(Rejection::MissingIdentifier)?
            .to_string();

        let info = raw.get("info").unwrap_or(&Value::Null);
        let game_end = coerce_i64(info.get("gameEndTimestamp"), 0);
        let raw_duration = coerce_i64(info.get("gameDuration"), 0);
        // Without gameEndTimestamp the source reports the duration in milliseconds
        let has_end = info.get("gameEndTimestamp").map_or(false, |v| !v.is_null());
        let duration = if has_end { raw_duration } else { raw_duration / 1000 };

        let participants: Vec<CanonicalParticipant> = array_of(info.get("participants"))
            .iter()
            .map(normalize_participant)
            .collect();

        let mut teams: Vec<CanonicalTeam> = array_of(info.get("teams")).iter().map(normalize_team).collect();

        if let Some(tl) = timeline {
            let mut snapshots = timeline::team_snapshots(tl, &participants);
            for team in &mut teams {
                if let Some(s) = snapshots.remove(&team.team_id) {
                    team.snapshots = s;
                }
            }
        }

        Ok(CanonicalRecord {
            match_id,
            platform: string_of(info.get("platformId")),
            game_creation: coerce_i64(info.get("gameCreation"), 0),
            game_start: coerce_i64(info.get("gameStartTimestamp"), 0),
            game_end,
            duration,
            game_mode: string_of(info.get("gameMode")),
            game_type: string_of(info.get("gameType")),
            queue_id: coerce_i64(info.get("queueId"), 0),
            patch: derive_patch(info.get("gameVersion")),
            participants,
            teams,
        })
    }
}

fn normalize_participant(p: &Value) -> CanonicalParticipant {
    let name = string_of(p.get("riotIdGameName"));
    let tag = string_of(p.get("riotIdTagline"));
    let riot_id = match (name.is_empty(), tag.is_empty()) {
        (false, false) => format!("{}#{}", name, tag),
        (false, true) => name,
        _ => string_of(p.get("summonerName")),
    };
    let items = (0..MAX_ITEM_SLOTS)
        .map(|slot| coerce_i64(p.get(format!("item{}", slot).as_str()), 0))
        .filter(|id| *id > 0)
        .collect();

    CanonicalParticipant {
        puuid: string_of(p.get("puuid")),
        riot_id,
        participant_id: coerce_i64(p.get("participantId"), 0),
        team_id: coerce_i64(p.get("teamId"), 0),
        win: win_flag(p.get("win")),
        champion_id: coerce_i64(p.get("championId"), 0),
        champion_name: string_of(p.get("championName")),
        team_position: string_of(p.get("teamPosition")),
        individual_position: string_of(p.get("individualPosition")),
        kills: coerce_i64(p.get("kills"), 0),
        deaths: coerce_i64(p.get("deaths"), 0),
        assists: coerce_i64(p.get("assists"), 0),
        gold_earned: coerce_i64(p.get("goldEarned"), 0),
        damage_to_champions: coerce_i64(p.get("totalDamageDealtToChampions"), 0),
        minions_killed: coerce_i64(p.get("totalMinionsKilled"), 0),
        neutral_minions_killed: coerce_i64(p.get("neutralMinionsKilled"), 0),
        vision_score: coerce_i64(p.get("visionScore"), 0),
        items,
    }
}

fn normalize_team(t: &Value) -> CanonicalTeam {
    let objectives = t.get("objectives").unwrap_or(&Value::Null);
    let kills = |name: &str| coerce_i64(objectives.get(name).and_then(|o| o.get("kills")), 0);
    let first = |name: &str| {
        objectives
            .get(name)
            .and_then(|o| o.get("first"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    CanonicalTeam {
        team_id: coerce_i64(t.get("teamId"), 0),
        win: win_flag(t.get("win")),
        objectives: ObjectiveSummary {
            champion_kills: kills("champion"),
            tower_kills: kills("tower"),
            inhibitor_kills: kills("inhibitor"),
            dragon_kills: kills("dragon"),
            baron_kills: kills("baron"),
            rift_herald_kills: kills("riftHerald"),
            first_blood: first("champion"),
            first_tower: first("tower"),
            first_dragon: first("dragon"),
            first_baron: first("baron"),
        },
        snapshots: Vec::new(),
    }
}

/// First two dot-separated components of the version string.
///
/// Fewer than two components pass through; blank, non-string or absent yields `unknown`.
pub fn derive_patch(version: Option<&Value>) -> String {
    let Some(raw) = version.and_then(Value::as_str).map(str::trim) else {
        return UNKNOWN_PATCH.to_string();
    };
    if raw.is_empty() {
        return UNKNOWN_PATCH.to_string();
    }
    let mut parts = raw.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{}.{}", major, minor),
        _ => raw.to_string(),
    }
}

/// The value as a finite integer, else `default`. Floats truncate toward zero.
pub fn coerce_i64(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(default),
        None => default,
    }
}

/// The value as a finite float, else `default`.
pub fn coerce_f64(value: Option<&Value>, default: f64) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|f| f.is_finite())
        .unwrap_or(default)
}

/// Native `true` or the literal `"Win"` marker.
pub fn win_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "Win",
        _ => false,
    }
}

fn string_of(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn array_of(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
