/// Routing, storage and output naming shared across the ingest and aggregate binaries.
use std::fmt;
use std::str::FromStr;

// Regional routing values accepted on the CLI / RIOT_REGION
pub const REGION_AMERICAS: &str = "americas";
pub const REGION_EUROPE: &str = "europe";
pub const REGION_ASIA: &str = "asia";
pub const REGION_SEA: &str = "sea";

/// Header carrying the API credential
pub const API_KEY_HEADER: &str = "X-Riot-Token";

/// Team ids used by the compact index win flags
pub const BLUE_TEAM_ID: i64 = 100;
pub const RED_TEAM_ID: i64 = 200;

/// Patch tag used when the raw version is missing or unusable
pub const UNKNOWN_PATCH: &str = "unknown";

/// Timeline minutes captured as team snapshots
pub const SNAPSHOT_MINUTES: [usize; 2] = [10, 15];

/// Fractional digits kept on every derived ratio/average
pub const ROUND_DIGITS: i32 = 4;

// Raw store subdirectories
pub const MATCH_DIR: &str = "match";
pub const TIMELINE_DIR: &str = "timeline";

// Canonical store and dataset file names
pub const CANONICAL_FILE: &str = "matches.ndjson";
pub const METADATA_FILE: &str = "metadata.json";
pub const CHAMPIONS_FILE: &str = "champions.json";
pub const QUEUES_FILE: &str = "queues.json";
pub const PATCHES_FILE: &str = "patches.json";
pub const DAYS_FILE: &str = "days.json";
pub const MATCH_INDEX_FILE: &str = "match_index.json";

/// Regional routing tag for the match API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Americas,
    Europe,
    Asia,
    Sea,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Americas => REGION_AMERICAS,
            Region::Europe => REGION_EUROPE,
            Region::Asia => REGION_ASIA,
            Region::Sea => REGION_SEA,
        }
    }

    /// Default API host for this routing value
    pub fn base_url(&self) -> String {
        format!("https://{}.api.riotgames.com", self.as_str())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            REGION_AMERICAS => Ok(Region::Americas),
            REGION_EUROPE => Ok(Region::Europe),
            REGION_ASIA => Ok(Region::Asia),
            REGION_SEA => Ok(Region::Sea),
            other => Err(format!(
                "unknown region '{}' (expected one of: {})",
                other,
                supported_regions().join(", ")
            )),
        }
    }
}

/// Get all supported routing values
pub fn supported_regions() -> Vec<&'static str> {
    vec![REGION_AMERICAS, REGION_EUROPE, REGION_ASIA, REGION_SEA]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_parse() {
        assert_eq!("europe".parse::<Region>().unwrap(), Region::Europe);
        assert_eq!(" SEA ".parse::<Region>().unwrap(), Region::Sea);
        assert!("euw1".parse::<Region>().is_err());
    }

    #[test]
    fn test_region_base_url() {
        assert_eq!(Region::Americas.base_url(), "https://americas.api.riotgames.com");
    }
}
