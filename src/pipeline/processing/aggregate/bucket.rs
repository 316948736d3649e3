use crate::constants::ROUND_DIGITS;
use crate::types::{CanonicalParticipant, CanonicalRecord, ChampionRow, RollupStats};

/// Running totals for one champion. Created on first sighting, never decremented.
///
/// Sums saturate: a coerced extreme counter pins at the bound instead of wrapping.
#[derive(Debug, Default, Clone)]
pub struct ChampionBucket {
    pub name: String,
    pub games: u64,
    pub wins: u64,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub gold: i64,
    pub damage: i64,
    pub creep_score: i64,
}

impl ChampionBucket {
    pub fn observe(&mut self, p: &CanonicalParticipant) {
        if self.name.is_empty() && !p.champion_name.is_empty() {
            self.name = p.champion_name.clone();
        }
        self.games += 1;
        if p.win {
            self.wins += 1;
        }
        self.kills = self.kills.saturating_add(p.kills);
        self.deaths = self.deaths.saturating_add(p.deaths);
        self.assists = self.assists.saturating_add(p.assists);
        self.gold = self.gold.saturating_add(p.gold_earned);
        self.damage = self.damage.saturating_add(p.damage_to_champions);
        self.creep_score = self.creep_score.saturating_add(p.creep_score());
    }

    pub fn to_row(&self, champion_id: i64) -> ChampionRow {
        ChampionRow {
            champion_id,
            champion_name: self.name.clone(),
            games: self.games,
            wins: self.wins,
            win_rate: rate(self.wins, self.games),
            avg_kills: average(self.kills, self.games),
            avg_deaths: average(self.deaths, self.games),
            avg_assists: average(self.assists, self.games),
            avg_gold: average(self.gold, self.games),
            avg_damage: average(self.damage, self.games),
            avg_creep_score: average(self.creep_score, self.games),
        }
    }
}

/// Running totals for one queue, patch or day.
#[derive(Debug, Default, Clone)]
pub struct RollupBucket {
    pub games: u64,
    pub blue_wins: u64,
    pub duration_sum: i64,
    /// Games with a positive duration
    pub duration_samples: u64,
    pub kills_sum: i64,
}

impl RollupBucket {
    pub fn observe(&mut self, record: &CanonicalRecord, blue_win: bool, total_kills: i64) {
        self.games += 1;
        if blue_win {
            self.blue_wins += 1;
        }
        if record.duration > 0 {
            self.duration_sum = self.duration_sum.saturating_add(record.duration);
            self.duration_samples += 1;
        }
        self.kills_sum = self.kills_sum.saturating_add(total_kills);
    }

    pub fn stats(&self) -> RollupStats {
        RollupStats {
            games: self.games,
            blue_wins: self.blue_wins,
            blue_win_rate: rate(self.blue_wins, self.games),
            avg_duration: average(self.duration_sum, self.duration_samples),
            avg_total_kills: average(self.kills_sum, self.games),
        }
    }
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let rounded = (value * factor).round() / factor;
    // normalizes -0.0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// `part / whole` in [0, 1]; zero when `whole` is zero.
pub fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to((part.min(whole) as f64) / (whole as f64), ROUND_DIGITS)
}

pub fn average(sum: i64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    round_to(sum as f64 / count as f64, ROUND_DIGITS)
}
