use std::{collections::HashMap, time::Duration};

use reqwest::blocking;
use serde::Deserialize;
use tracing::info;

use crate::{config::Config, error::FeedError};

/// Select menus hold at most this many options.
pub const LINE_GROUP_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Line {
    #[serde(skip)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub range: String,
    pub pos: String,
}

impl Line {
    pub fn label(&self) -> String {
        if self.range.is_empty() {
            self.name.clone()
        } else {
            format!("{}({})", self.name, self.range)
        }
    }
}

pub fn line_groups(lines: &[Line]) -> Vec<&[Line]> {
    lines.chunks(LINE_GROUP_SIZE).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelayedTrain {
    pub display_type: String,
    pub destination: String,
    pub type_change: Option<String>,
    pub number: String,
    pub delay_minutes: u32,
    /// Name of the station the train is near, when its position is known.
    pub near: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMaster {
    lines: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDest {
    Text { text: String },
    Plain(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrain {
    #[serde(default)]
    delay_minutes: u32,
    #[serde(default)]
    pos: String,
    #[serde(default)]
    display_type: String,
    dest: Option<RawDest>,
    type_change: Option<String>,
    #[serde(default)]
    no: String,
}

#[derive(Debug, Deserialize)]
struct RawTrains {
    trains: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawStationInfo {
    code: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawStation {
    info: RawStationInfo,
}

#[derive(Debug, Deserialize)]
struct RawStations {
    stations: Vec<RawStation>,
}

fn parse_lines(body: &str) -> Result<Vec<Line>, FeedError> {
    let master: RawMaster = serde_json::from_str(body).map_err(|source| FeedError::Parse {
        feed: "westjr line master",
        source,
    })?;

    Ok(master
        .lines
        .into_iter()
        .filter_map(|(key, value)| {
            let mut line: Line = serde_json::from_value(value).ok()?;
            line.key = key;
            Some(line)
        })
        .collect())
}

fn parse_delayed_trains(trains: &str, stations: &str) -> Result<Vec<DelayedTrain>, FeedError> {
    let trains: RawTrains = serde_json::from_str(trains).map_err(|source| FeedError::Parse {
        feed: "westjr trains",
        source,
    })?;
    let stations: RawStations =
        serde_json::from_str(stations).map_err(|source| FeedError::Parse {
            feed: "westjr stations",
            source,
        })?;

    let names: HashMap<String, String> = stations
        .stations
        .into_iter()
        .map(|s| (s.info.code, s.info.name))
        .collect();

    Ok(trains
        .trains
        .into_iter()
        .filter_map(|v| serde_json::from_value::<RawTrain>(v).ok())
        .filter(|t| t.delay_minutes > 0)
        .map(|t| {
            let near = t
                .pos
                .split('_')
                .next()
                .and_then(|code| names.get(code))
                .cloned();

            let display_type = match t.display_type.strip_suffix('○') {
                Some(stem) => format!("{stem}速"),
                None => t.display_type,
            };

            let destination = match t.dest {
                Some(RawDest::Text { text }) => text,
                Some(RawDest::Plain(text)) => text,
                None => String::new(),
            };

            DelayedTrain {
                display_type,
                destination,
                type_change: t.type_change.filter(|tc| !tc.trim().is_empty()),
                number: t.no,
                delay_minutes: t.delay_minutes,
                near,
            }
        })
        .collect())
}

/// Client for the JR West train-guide feed.
#[derive(Debug, Clone)]
pub struct WestJrClient {
    base_url: String,
    area: String,
    timeout: Duration,
}

impl WestJrClient {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.westjr_base_url.trim_end_matches('/').to_owned(),
            area: config.westjr_area.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn fetch_text(&self, feed: &'static str, url: &str) -> Result<String, FeedError> {
        info!("Fetching {feed} from {url}");
        let client = blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|source| FeedError::Http { feed, source })?;

        let response = client
            .get(url)
            .send()
            .map_err(|source| FeedError::Http { feed, source })?;
        if !response.status().is_success() {
            return Err(FeedError::Status {
                feed,
                status: response.status(),
            });
        }

        response
            .text()
            .map_err(|source| FeedError::Http { feed, source })
    }

    pub fn fetch_lines(&self) -> Result<Vec<Line>, FeedError> {
        let url = format!("{}/api/v3/{}.json", self.base_url, self.area);
        parse_lines(&self.fetch_text("westjr line master", &url)?)
    }

    pub fn fetch_delayed_trains(&self, line: &Line) -> Result<Vec<DelayedTrain>, FeedError> {
        let url = format!("{}{}", self.base_url, line.pos);
        let trains = self.fetch_text("westjr trains", &url)?;
        let stations = self.fetch_text("westjr stations", &url.replace(".json", "_st.json"))?;
        parse_delayed_trains(&trains, &stations)
    }
}
