use serde::{Deserialize, Serialize};

/// Normalized, stable-shape projection of one match payload.
///
/// One of these is written per line to the canonical store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub match_id: String,
    pub platform: String,
    /// Epoch milliseconds
    pub game_creation: i64,
    pub game_start: i64,
    pub game_end: i64,
    /// Seconds
    pub duration: i64,
    pub game_mode: String,
    pub game_type: String,
    pub queue_id: i64,
    pub patch: String,
    pub participants: Vec<CanonicalParticipant>,
    pub teams: Vec<CanonicalTeam>,
}

impl CanonicalRecord {
    /// Sum of participant kills
    pub fn total_kills(&self) -> i64 {
        self.participants
            .iter()
            .fold(0i64, |acc, p| acc.saturating_add(p.kills))
    }

    pub fn team_won(&self, team_id: i64) -> bool {
        self.teams.iter().any(|t| t.team_id == team_id && t.win)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalParticipant {
    pub puuid: String,
    pub riot_id: String,
    pub participant_id: i64,
    pub team_id: i64,
    pub win: bool,
    pub champion_id: i64,
    pub champion_name: String,
    pub team_position: String,
    pub individual_position: String,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub gold_earned: i64,
    pub damage_to_champions: i64,
    pub minions_killed: i64,
    pub neutral_minions_killed: i64,
    pub vision_score: i64,
    /// Non-empty item slots, at most seven
    pub items: Vec<i64>,
}

impl CanonicalParticipant {
    /// Lane minions plus neutral monsters
    pub fn creep_score(&self) -> i64 {
        self.minions_killed.saturating_add(self.neutral_minions_killed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTeam {
    pub team_id: i64,
    pub win: bool,
    pub objectives: ObjectiveSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<TeamSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveSummary {
    pub champion_kills: i64,
    pub tower_kills: i64,
    pub inhibitor_kills: i64,
    pub dragon_kills: i64,
    pub baron_kills: i64,
    pub rift_herald_kills: i64,
    pub first_blood: bool,
    pub first_tower: bool,
    pub first_dragon: bool,
    pub first_baron: bool,
}

/// Team totals at a fixed timeline minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSnapshot {
    pub minute: usize,
    pub total_gold: i64,
    pub xp: i64,
    pub creep_score: i64,
    pub level_sum: i64,
    pub participants: usize,
}

/// Minimal per-match projection kept for cross-referencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactIndexEntry {
    pub match_id: String,
    pub start: i64,
    pub queue_id: i64,
    pub patch: String,
    pub duration: i64,
    pub blue_win: bool,
    pub red_win: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub match_count: u64,
    pub participant_count: u64,
    pub dropped_lines: u64,
    pub champion_count: usize,
    pub queue_count: usize,
    pub patch_count: usize,
    pub day_count: usize,
    pub time_range: TimeRange,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionRow {
    pub champion_id: i64,
    pub champion_name: String,
    pub games: u64,
    pub wins: u64,
    pub win_rate: f64,
    pub avg_kills: f64,
    pub avg_deaths: f64,
    pub avg_assists: f64,
    pub avg_gold: f64,
    pub avg_damage: f64,
    pub avg_creep_score: f64,
}

/// Stats shared by the queue, patch and day rollups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupStats {
    pub games: u64,
    pub blue_wins: u64,
    pub blue_win_rate: f64,
    pub avg_duration: f64,
    pub avg_total_kills: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRow {
    pub queue_id: i64,
    #[serde(flatten)]
    pub stats: RollupStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRow {
    pub patch: String,
    #[serde(flatten)]
    pub stats: RollupStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRow {
    /// UTC calendar day, `YYYY-MM-DD`
    pub date: String,
    #[serde(flatten)]
    pub stats: RollupStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_snapshots_omitted_when_empty() {
        let team = CanonicalTeam {
            team_id: 100,
            win: true,
            objectives: ObjectiveSummary::default(),
            snapshots: Vec::new(),
        };
        let json = serde_json::to_value(&team).unwrap();
        assert!(json.get("snapshots").is_none());
        assert_eq!(json["teamId"], 100);
        let back: CanonicalTeam = serde_json::from_value(json).unwrap();
        assert_eq!(back, team);
    }
}
