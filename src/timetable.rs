use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use itertools::Itertools;

use crate::odpt::{station::StationId, train_timetable::TrainTimetable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceDay {
    Weekday,
    SaturdayHoliday,
}

impl ServiceDay {
    /// Public holidays aren't known here, so only weekends map to the
    /// saturday/holiday timetable.
    pub fn for_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => ServiceDay::SaturdayHoliday,
            _ => ServiceDay::Weekday,
        }
    }

    fn runs_on(self, calendar: &str) -> bool {
        if calendar.is_empty() {
            return true;
        }

        let calendar = calendar.rsplit(':').next().unwrap_or(calendar);
        match self {
            ServiceDay::Weekday => calendar == "Weekday",
            ServiceDay::SaturdayHoliday => {
                matches!(calendar, "SaturdayHoliday" | "Saturday" | "Holiday")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub time: NaiveTime,
    pub station: StationId,
    pub train_number: String,
    pub train_type: String,
    pub railway: String,
    pub destinations: Vec<StationId>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DepartureFilter<'a> {
    pub railway: Option<&'a str>,
    pub day: Option<ServiceDay>,
    pub after: Option<NaiveTime>,
}

/// Every departure from any of `stations`, earliest first.
pub fn departures(
    timetables: &[TrainTimetable],
    stations: &[StationId],
    filter: DepartureFilter,
) -> Vec<Departure> {
    timetables
        .iter()
        .filter(|t| filter.railway.map_or(true, |r| t.railway == r))
        .filter(|t| filter.day.map_or(true, |d| d.runs_on(&t.calendar)))
        .flat_map(|t| {
            t.stops
                .iter()
                .filter(move |s| stations.contains(&s.station))
                .filter_map(move |s| {
                    let time = s.departure_time?;
                    Some(Departure {
                        time,
                        station: s.station.clone(),
                        train_number: t.train_number.clone(),
                        train_type: t.train_type.clone(),
                        railway: t.railway.clone(),
                        destinations: t.destinations.clone(),
                    })
                })
        })
        .filter(|d| filter.after.map_or(true, |after| d.time >= after))
        .sorted_by(|a, b| a.time.cmp(&b.time).then_with(|| a.train_number.cmp(&b.train_number)))
        .collect()
}
