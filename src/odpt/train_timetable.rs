use chrono::NaiveTime;
use serde::Deserialize;

use crate::odpt::station::StationId;

#[derive(Debug, Clone)]
pub struct TimetableStop {
    pub station: StationId,
    pub departure_time: Option<NaiveTime>,
}

#[derive(Debug, Clone)]
pub struct TrainTimetable {
    pub train_number: String,
    pub train_type: String,
    pub railway: String,
    pub calendar: String,
    pub destinations: Vec<StationId>,
    pub stops: Vec<TimetableStop>,
}

#[derive(Debug, Deserialize)]
struct RawStop {
    #[serde(rename = "odpt:departureStation")]
    departure_station: Option<String>,
    #[serde(rename = "odpt:arrivalStation")]
    arrival_station: Option<String>,
    #[serde(rename = "odpt:departureTime")]
    departure_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawTrainTimetable {
    #[serde(rename = "odpt:trainNumber")]
    train_number: Option<String>,
    #[serde(rename = "odpt:trainType")]
    train_type: Option<String>,
    #[serde(rename = "odpt:railway")]
    railway: Option<String>,
    #[serde(rename = "odpt:calendar")]
    calendar: Option<String>,
    #[serde(rename = "odpt:destinationStation")]
    destination_station: Option<Vec<String>>,
    #[serde(rename = "odpt:trainTimetableObject", default)]
    stops: Vec<RawStop>,
}

fn parse_time(s: Option<&str>) -> Option<NaiveTime> {
    s.and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
}

impl RawTrainTimetable {
    pub(super) fn into_timetable(self) -> TrainTimetable {
        let stops = self
            .stops
            .into_iter()
            .filter_map(|s| {
                let station = s
                    .departure_station
                    .as_deref()
                    .or(s.arrival_station.as_deref())
                    .filter(|st| !st.is_empty())?;

                Some(TimetableStop {
                    station: StationId::new(station),
                    departure_time: parse_time(s.departure_time.as_deref()),
                })
            })
            .collect();

        TrainTimetable {
            train_number: self.train_number.unwrap_or_default(),
            train_type: self.train_type.unwrap_or_default(),
            railway: self.railway.unwrap_or_default(),
            calendar: self.calendar.unwrap_or_default(),
            destinations: self
                .destination_station
                .unwrap_or_default()
                .iter()
                .map(|s| StationId::new(s))
                .collect(),
            stops,
        }
    }
}
