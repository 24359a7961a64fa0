//! Engine configuration.
//!
//! Every threshold the engine uses lives here so call sites never carry their
//! own literals. Values are layered: built-in defaults, then an optional TOML
//! file (`~/.config/clubcal/config.toml`), then `CLUBCAL_*` environment
//! variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_JUST_OPENED_DAYS, DEFAULT_LOW_CAPACITY_THRESHOLD, DEFAULT_OPENING_SOON_DAYS,
    DEFAULT_REFRESH_DEBOUNCE_SECS, DEFAULT_TIMEZONE,
};
use crate::error::{ClubCalError, ClubCalResult};
use crate::tags::{AutoTagRule, CommitteePrefixes, KeywordTag};

/// How much of the calendar a logged-in membership tier may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TierAccess {
    /// Everything members can see
    Full,
    /// Public events, plus events with a ticket type naming the tier
    PublicOnly,
    /// Only events that sell guest tickets
    GuestTicketsOnly,
}

/// Tunable engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum time away before a visibility signal refetches (e.g. "60s")
    #[serde(with = "humantime_duration")]
    pub refresh_debounce: Duration,

    /// Remaining spots at or below which an event is "low"
    pub low_capacity_threshold: u32,

    /// Registration windows in days; negative values are rejected at load
    pub just_opened_days: u32,
    pub opening_soon_days: u32,

    /// Club timezone; naive feed timestamps and all time-of-day checks use it
    pub timezone: Tz,

    /// Membership tier (case-insensitive) to access policy. Unlisted tiers get full access.
    pub tier_access: BTreeMap<String, TierAccess>,

    /// Interest name to name keywords
    pub interest_keywords: BTreeMap<String, Vec<String>>,

    /// Known committee name prefixes, checked in order
    pub committee_prefixes: Vec<CommitteePrefixes>,

    pub auto_tag_rules: Vec<AutoTagRule>,

    /// Title keywords to `type:` tags, first match wins
    pub event_type_keywords: Vec<KeywordTag>,

    /// Name or location words that tag an event `venue:outdoor`
    pub outdoor_keywords: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            refresh_debounce: Duration::from_secs(DEFAULT_REFRESH_DEBOUNCE_SECS),
            low_capacity_threshold: DEFAULT_LOW_CAPACITY_THRESHOLD,
            just_opened_days: DEFAULT_JUST_OPENED_DAYS,
            opening_soon_days: DEFAULT_OPENING_SOON_DAYS,
            timezone: chrono_tz::America::Los_Angeles,
            tier_access: default_tier_access(),
            interest_keywords: default_interest_keywords(),
            committee_prefixes: default_committee_prefixes(),
            auto_tag_rules: Vec::new(),
            event_type_keywords: default_event_type_keywords(),
            outdoor_keywords: ["park", "beach", "trail", "garden", "outdoor", "preserve", "hike"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

fn default_tier_access() -> BTreeMap<String, TierAccess> {
    BTreeMap::from([
        ("alumni".to_string(), TierAccess::PublicOnly),
        ("guest".to_string(), TierAccess::GuestTicketsOnly),
    ])
}

fn default_interest_keywords() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 14] = [
        ("food", &["dinner", "lunch", "brunch", "restaurant", "food", "cooking", "chef", "cuisine", "potluck", "meal"]),
        ("wine", &["wine", "winery", "vineyard", "tasting", "sommelier"]),
        ("beer", &["beer", "brewery", "ale", "lager", "craft beer", "pub"]),
        ("performing-arts", &["theater", "theatre", "concert", "symphony", "opera", "ballet", "play", "musical", "performance"]),
        ("visual-arts", &["gallery", "museum", "art walk", "exhibit", "artist", "painting", "sculpture"]),
        ("tours", &["tour", "historic", "heritage", "architecture", "walking tour", "docent"]),
        ("outdoors", &["hike", "hiking", "trail", "beach", "park", "outdoor", "nature", "canyon", "mountain"]),
        ("athletic", &["golf", "cycling", "bike", "sailing", "kayak", "pickleball", "tennis", "bowling"]),
        ("garden", &["garden", "botanic", "plant", "flower", "nursery"]),
        ("books", &["book", "read", "author", "novel", "literary"]),
        ("discussion", &["discussion", "current events", "foreign policy", "politics", "speaker"]),
        ("wellness", &["wellness", "mindfulness", "meditation", "soundbath", "healing"]),
        ("social", &["happy hour", "social", "mixer", "networking", "party"]),
        ("games", &["game", "trivia", "cards", "canasta", "bunco", "billiards", "board game"]),
    ];
    table
        .into_iter()
        .map(|(interest, words)| {
            (interest.to_string(), words.iter().map(|w| w.to_string()).collect())
        })
        .collect()
}

fn default_event_type_keywords() -> Vec<KeywordTag> {
    [
        ("workshop", "type:workshop"),
        ("tasting", "type:tasting"),
        ("day trip", "type:trip"),
        ("tour", "type:trip"),
        ("hike", "type:hike"),
        ("walk", "type:walk"),
        ("happy hour", "type:happy-hour"),
        ("game night", "type:game-night"),
        ("discussion", "type:discussion"),
        ("lecture", "type:lecture"),
        ("class", "type:class"),
        ("performance", "type:performance"),
        ("concert", "type:performance"),
        ("show", "type:performance"),
    ]
    .into_iter()
    .map(|(keyword, tag)| KeywordTag::new(keyword, tag))
    .collect()
}

fn default_committee_prefixes() -> Vec<CommitteePrefixes> {
    vec![
        CommitteePrefixes::new("Games!", &["Games!:", "Games!"]),
        CommitteePrefixes::new("Wellness", &["Wellness:"]),
        CommitteePrefixes::new("Arts", &["Arts:", "SB Arts:", "Visual Arts:"]),
        CommitteePrefixes::new("Local Heritage", &["Local Heritage:"]),
        CommitteePrefixes::new("Wine Appreciation", &["Wine Appreciation:"]),
        CommitteePrefixes::new("Pop-Up", &["Pop-Up:", "Pop Up:"]),
        CommitteePrefixes::new("Happy Hikers", &["Happy Hikers:"]),
        CommitteePrefixes::new("Garden", &["Garden:", "Gardening:"]),
        CommitteePrefixes::new("Volunteers", &["Volunteers in Action:"]),
        CommitteePrefixes::new("Epicurious", &["Epicurious:"]),
        CommitteePrefixes::new("Current Events", &["Current Events:", "Foreign Policy:"]),
        CommitteePrefixes::new("Book Clubs", &["Afternoon Book:", "Evening Book:", "Books and Bites:"]),
        CommitteePrefixes::new("TGIF", &["TGIF:"]),
        CommitteePrefixes::new("Performing Arts", &["Performing Arts:", "Theater Lovers:"]),
        CommitteePrefixes::new("Golf", &["Golf:"]),
        CommitteePrefixes::new("Cycling", &["Cycling:"]),
        CommitteePrefixes::new("Beer Lovers", &["Beer Lovers:"]),
        CommitteePrefixes::new("Out to Lunch", &["Out to Lunch:"]),
    ]
}

impl EngineConfig {
    /// Access policy for a logged-in tier.
    pub fn access_for(&self, tier: &str) -> TierAccess {
        let tier = tier.trim();
        self.tier_access
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tier))
            .map(|(_, access)| *access)
            .unwrap_or(TierAccess::Full)
    }

    /// Keywords for an interest, if it is known.
    pub fn interest(&self, interest: &str) -> Option<&[String]> {
        let interest = interest.trim().to_lowercase();
        self.interest_keywords.get(&interest).map(Vec::as_slice)
    }

    pub fn refresh_debounce_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.refresh_debounce).unwrap_or(chrono::Duration::MAX)
    }

    pub fn config_path() -> ClubCalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ClubCalError::Config("Could not determine config directory".into()))?
            .join("clubcal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load with defaults, the config file (if present) and the environment.
    pub fn load(path: Option<&Path>) -> ClubCalResult<Self> {
        Ok(layered(path)?.try_deserialize()?)
    }

    pub fn to_toml(&self) -> ClubCalResult<String> {
        toml::to_string_pretty(self).map_err(|e| ClubCalError::Serialization(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> ClubCalResult<()> {
        let contents = format!(
            "\
# clubcal configuration

# Where the event feed comes from (one of):
# feed_url = \"https://example.org/events.json\"
# feed_file = \"events.json\"

# Membership level of the viewer; leave unset for an anonymous visitor:
# membership_level = \"NewcomerMember\"

# How long the calendar must be in the background before a refetch:
# refresh_debounce = \"{debounce}s\"

# Remaining spots at or below which an event shows \"Limited spots\":
# low_capacity_threshold = {threshold}

# Registration windows for the just-opened and opening-soon filters:
# just_opened_days = {just_opened}
# opening_soon_days = {opening_soon}

# Club timezone:
# timezone = \"{timezone}\"

# Membership tiers with restricted access (full, public-only, guest-tickets-only):
# [tier_access]
# alumni = \"public-only\"
# guest = \"guest-tickets-only\"

# Extra tags from event names (name-prefix, name-contains, name-suffix):
# [[auto_tag_rules]]
# type = \"name-prefix\"
# pattern = \"Happy Hikers:\"
# tag = \"committee:hikers\"
",
            debounce = DEFAULT_REFRESH_DEBOUNCE_SECS,
            threshold = DEFAULT_LOW_CAPACITY_THRESHOLD,
            just_opened = DEFAULT_JUST_OPENED_DAYS,
            opening_soon = DEFAULT_OPENING_SOON_DAYS,
            timezone = DEFAULT_TIMEZONE,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClubCalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ClubCalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

/// The layered config sources, for callers that deserialize their own
/// settings alongside `EngineConfig`.
pub fn layered(path: Option<&Path>) -> ClubCalResult<config::Config> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(false));
    }
    let settings = builder
        .add_source(config::Environment::with_prefix("CLUBCAL").try_parsing(true))
        .build()?;
    Ok(settings)
}

/// `Duration` as a humantime string ("60s", "2m"). Bare numbers are seconds.
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => return Ok(Duration::from_secs(secs)),
            Raw::Text(raw) => raw,
        };
        let raw = raw.trim();
        if let Ok(secs) = raw.parse::<u64>() {
            return Ok(Duration::from_secs(secs));
        }
        humantime::parse_duration(raw).map_err(serde::de::Error::custom)
    }
}
