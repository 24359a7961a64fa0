//! Built-in defaults. Every value here can be overridden through `EngineConfig`.

/// Seconds a tab must have been away before a visibility signal refetches.
pub const DEFAULT_REFRESH_DEBOUNCE_SECS: u64 = 60;

/// Remaining spots at or below which an event counts as "low".
pub const DEFAULT_LOW_CAPACITY_THRESHOLD: u32 = 3;

pub const DEFAULT_JUST_OPENED_DAYS: u32 = 7;
pub const DEFAULT_OPENING_SOON_DAYS: u32 = 7;

pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// A "Committee: Title" prefix only counts when the colon sits this close to the start.
pub const COMMITTEE_PREFIX_MAX: usize = 30;

/// Committee assigned to events without a recognizable prefix.
pub const GENERAL_COMMITTEE: &str = "General";

/// Tags that mark an event as open to non-members.
pub const PUBLIC_TAGS: [&str; 2] = ["public", "public event"];

/// Substrings of a tag that mark an event as suitable for new members.
pub const NEWBIE_TAG_MARKERS: [&str; 3] = ["newbie", "new member", "orientation"];

/// Name words that mark a recurring series, checked in order. Each yields `recurring:<word>`.
pub const RECURRING_MARKERS: [&str; 3] = ["weekly", "monthly", "daily"];

/// Tag for events held outdoors.
pub const OUTDOOR_VENUE_TAG: &str = "venue:outdoor";

/// Events whose name carries this marker are dropped at ingestion.
pub const CANCELLED_MARKER: &str = "CANCELLED";

/// Hours bounding the time-of-day buckets: morning < 12 <= afternoon < 17 <= evening.
pub const AFTERNOON_START_HOUR: u32 = 12;
pub const EVENING_START_HOUR: u32 = 17;

/// Upper bound on one feed fetch before it is reported as failed.
pub const FETCH_TIMEOUT_SECS: u64 = 30;
