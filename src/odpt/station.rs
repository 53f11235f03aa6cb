use std::collections::HashMap;

use geo_types::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StationId(String);

impl StationId {
    pub fn new(str: &str) -> Self {
        Self(str.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last dotted component, e.g. `Shibuya` for
    /// `odpt.Station:TokyoMetro.Ginza.Shibuya`.
    pub fn short_name(&self) -> &str {
        self.0.rsplit(['.', ':']).next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct StationRecord {
    pub id: StationId,
    pub title: String,
    pub title_ja: Option<String>,
    pub title_en: Option<String>,
    pub railway: String,
    pub station_code: Option<String>,
    pub coord: Option<Point>,
    pub connecting_stations: Vec<StationId>,
}

impl StationRecord {
    pub fn new(id: StationId, title: &str, railway: &str) -> Self {
        Self {
            id,
            title: title.to_owned(),
            title_ja: None,
            title_en: None,
            railway: railway.to_owned(),
            station_code: None,
            coord: None,
            connecting_stations: vec![],
        }
    }

    pub fn display_name(&self) -> &str {
        self.title_ja.as_deref().unwrap_or(&self.title)
    }

    /// Every name the record can be searched by, display name first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.display_name())
            .chain(std::iter::once(self.title.as_str()))
            .chain(self.title_en.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawStation {
    #[serde(rename = "owl:sameAs")]
    same_as: Option<String>,
    #[serde(rename = "dc:title")]
    title: Option<String>,
    #[serde(rename = "odpt:stationTitle")]
    station_title: Option<HashMap<String, String>>,
    #[serde(rename = "odpt:railway")]
    railway: Option<String>,
    #[serde(rename = "odpt:stationCode")]
    station_code: Option<String>,
    #[serde(rename = "geo:lat")]
    lat: Option<f64>,
    #[serde(rename = "geo:long")]
    long: Option<f64>,
    #[serde(rename = "odpt:connectingStation")]
    connecting_station: Option<Vec<String>>,
}

impl RawStation {
    pub(super) fn into_record(self) -> Option<StationRecord> {
        let id = StationId::new(self.same_as.as_deref().filter(|s| !s.is_empty())?);

        let mut titles = self.station_title.unwrap_or_default();
        let title_ja = titles.remove("ja").filter(|t| !t.is_empty());
        let title_en = titles.remove("en").filter(|t| !t.is_empty());
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .or_else(|| title_ja.clone())?;

        let coord = match (self.long, self.lat) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        };

        let connecting_stations = self
            .connecting_station
            .unwrap_or_default()
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| StationId::new(s))
            .collect();

        let railway = self.railway.unwrap_or_default();
        let mut record = StationRecord::new(id, &title, &railway);
        record.title_ja = title_ja;
        record.title_en = title_en;
        record.station_code = self.station_code.filter(|c| !c.is_empty());
        record.coord = coord;
        record.connecting_stations = connecting_stations;
        Some(record)
    }
}
