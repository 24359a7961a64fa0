//! Event feeds: the club's JSON endpoint or a static JSON file.

use std::path::PathBuf;

use clubcal_core::config::EngineConfig;
use clubcal_core::date_range::DateRange;
use clubcal_core::error::{ClubCalError, ClubCalResult};
use clubcal_core::event::Event;
use clubcal_core::ingest::parse_feed;
use clubcal_core::source::EventSource;

use crate::config::FeedLocation;

/// Keep only events whose local start date falls inside `window`.
fn within(events: Vec<Event>, window: &DateRange, config: &EngineConfig) -> Vec<Event> {
    events
        .into_iter()
        .filter(|e| window.contains_instant(e.start, &config.timezone))
        .collect()
}

/// GETs the feed URL, passing the window as `from`/`to` query parameters.
/// Servers that ignore them still work: the window is applied locally too.
pub struct HttpFeed {
    http: reqwest::Client,
    url: String,
    config: EngineConfig,
}

impl HttpFeed {
    pub fn new(url: &str, config: EngineConfig) -> Self {
        HttpFeed {
            http: reqwest::Client::new(),
            url: url.to_string(),
            config,
        }
    }
}

impl EventSource for HttpFeed {
    async fn fetch(&self, window: DateRange) -> ClubCalResult<Vec<Event>> {
        let mut query = Vec::new();
        if let Some(from) = window.from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = window.to {
            query.push(("to", to.to_string()));
        }

        let resp = self
            .http
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ClubCalError::Fetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClubCalError::Fetch(format!("HTTP {status} from {}", self.url)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ClubCalError::Fetch(e.to_string()))?;
        let events = parse_feed(&body, &self.config)?;
        Ok(within(events, &window, &self.config))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads a JSON feed from disk on every fetch, so edits show up on refresh.
pub struct FileFeed {
    path: PathBuf,
    config: EngineConfig,
}

impl FileFeed {
    pub fn new(path: PathBuf, config: EngineConfig) -> Self {
        FileFeed { path, config }
    }
}

impl EventSource for FileFeed {
    async fn fetch(&self, window: DateRange) -> ClubCalResult<Vec<Event>> {
        let body = tokio::fs::read_to_string(&self.path).await?;
        let events = parse_feed(&body, &self.config)?;
        Ok(within(events, &window, &self.config))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Either feed, chosen at startup.
pub enum Feed {
    Http(HttpFeed),
    File(FileFeed),
}

impl Feed {
    pub fn open(location: FeedLocation, config: &EngineConfig) -> Self {
        match location {
            FeedLocation::Url(url) => Feed::Http(HttpFeed::new(&url, config.clone())),
            FeedLocation::File(path) => Feed::File(FileFeed::new(path, config.clone())),
        }
    }
}

impl EventSource for Feed {
    async fn fetch(&self, window: DateRange) -> ClubCalResult<Vec<Event>> {
        match self {
            Feed::Http(feed) => feed.fetch(window).await,
            Feed::File(feed) => feed.fetch(window).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Feed::Http(feed) => feed.describe(),
            Feed::File(feed) => feed.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"{
        "events": [
            {"id": 1, "name": "Happy Hikers: Ridge Walk", "start_date": "2025-03-22T10:00:00",
             "tags": "hiking, public event"},
            {"id": 2, "name": "Wine Tasting", "start_date": "2025-04-02T18:00:00",
             "cost_category": "$25-50"},
            {"id": 3, "name": "CANCELLED Book Club", "start_date": "2025-03-25T10:00:00"}
        ]
    }"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn march() -> DateRange {
        DateRange::new(Some(d(2025, 3, 1)), Some(d(2025, 3, 31)))
    }

    #[tokio::test]
    async fn test_http_feed_passes_window_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events.json"))
            .and(query_param("from", "2025-03-01"))
            .and(query_param("to", "2025-03-31"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let feed = HttpFeed::new(&format!("{}/events.json", server.uri()), EngineConfig::default());
        let events = feed.fetch(march()).await.unwrap();

        let names: Vec<_> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Happy Hikers: Ridge Walk"]);
        assert!(events[0].is_public());
    }

    #[tokio::test]
    async fn test_http_error_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let feed = HttpFeed::new(&server.uri(), EngineConfig::default());
        let err = feed.fetch(march()).await.unwrap_err();
        assert!(matches!(err, ClubCalError::Fetch(ref msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_http_malformed_body_is_feed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let feed = HttpFeed::new(&server.uri(), EngineConfig::default());
        let err = feed.fetch(march()).await.unwrap_err();
        assert!(matches!(err, ClubCalError::Feed(_)));
    }

    #[tokio::test]
    async fn test_file_feed_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(&path, FEED).unwrap();

        let feed = Feed::open(FeedLocation::File(path.clone()), &EngineConfig::default());
        let events = feed.fetch(DateRange::default()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(feed.describe(), path.display().to_string());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FileFeed::new(dir.path().join("absent.json"), EngineConfig::default());
        let err = feed.fetch(DateRange::default()).await.unwrap_err();
        assert!(matches!(err, ClubCalError::Io(_)));
    }
}
