pub mod fare;
pub mod information;
pub mod station;
pub mod train_timetable;

use std::time::Duration;

use reqwest::blocking;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{
    config::Config,
    error::FeedError,
    odpt::{
        fare::{FareSegment, RawFare},
        information::{RawTrainInformation, TrainInformation},
        station::{RawStation, StationRecord},
        train_timetable::{RawTrainTimetable, TrainTimetable},
    },
};

/// Where the fare core gets its data from.
pub trait TransitSource {
    fn fetch_station_directory(&self) -> Result<Vec<StationRecord>, FeedError>;
    fn fetch_fare_segments(&self) -> Result<Vec<FareSegment>, FeedError>;
}

/// Client for the ODPT open-data API, scoped to one operator.
#[derive(Debug, Clone)]
pub struct OdptClient {
    base_url: String,
    operator: String,
    token: Option<String>,
    timeout: Duration,
}

impl OdptClient {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.odpt_base_url.trim_end_matches('/').to_owned(),
            operator: config.odpt_operator.clone(),
            token: config.odpt_token.clone().filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub fn fetch_train_information(&self) -> Result<Vec<TrainInformation>, FeedError> {
        let raw: Vec<RawTrainInformation> = self.fetch("odpt:TrainInformation")?;
        Ok(raw.into_iter().map(|r| r.into_information()).collect())
    }

    pub fn fetch_train_timetables(
        &self,
        railway: Option<&str>,
    ) -> Result<Vec<TrainTimetable>, FeedError> {
        let raw: Vec<RawTrainTimetable> = match railway {
            Some(railway) => self.fetch_filtered("odpt:TrainTimetable", &[("odpt:railway", railway)])?,
            None => self.fetch("odpt:TrainTimetable")?,
        };
        Ok(raw.into_iter().map(|r| r.into_timetable()).collect())
    }

    fn fetch<R: DeserializeOwned>(&self, feed: &'static str) -> Result<Vec<R>, FeedError> {
        self.fetch_filtered(feed, &[])
    }

    /// Fetches a feed as a JSON array, skipping elements that don't fit `R`.
    fn fetch_filtered<R: DeserializeOwned>(
        &self,
        feed: &'static str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<R>, FeedError> {
        let token = self.token.as_deref().ok_or(FeedError::MissingToken)?;
        let url = format!("{}/{}", self.base_url, feed);
        info!("Fetching {feed} from {url}");

        let client = blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|source| FeedError::Http { feed, source })?;

        let response = client
            .get(&url)
            .query(&[("odpt:operator", self.operator.as_str())])
            .query(filters)
            .query(&[("acl:consumerKey", token)])
            .send()
            .map_err(|source| FeedError::Http { feed, source })?;

        if !response.status().is_success() {
            return Err(FeedError::Status {
                feed,
                status: response.status(),
            });
        }

        let body = response
            .text()
            .map_err(|source| FeedError::Http { feed, source })?;

        parse_records(feed, &body)
    }
}

pub(crate) fn parse_records<R: DeserializeOwned>(
    feed: &'static str,
    body: &str,
) -> Result<Vec<R>, FeedError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|source| FeedError::Parse { feed, source })?;
    let total = values.len();

    let records: Vec<R> = values
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(r) => Some(r),
            Err(e) => {
                debug!("Skipping malformed {feed} record: {e}");
                None
            }
        })
        .collect();

    if records.len() < total {
        info!("Skipped {} of {total} {feed} records", total - records.len());
    }

    Ok(records)
}

impl TransitSource for OdptClient {
    fn fetch_station_directory(&self) -> Result<Vec<StationRecord>, FeedError> {
        let raw: Vec<RawStation> = self.fetch("odpt:Station")?;
        Ok(raw.into_iter().filter_map(|r| r.into_record()).collect())
    }

    fn fetch_fare_segments(&self) -> Result<Vec<FareSegment>, FeedError> {
        let raw: Vec<RawFare> = self.fetch("odpt:RailwayFare")?;
        Ok(raw.into_iter().filter_map(|r| r.into_segment()).collect())
    }
}
