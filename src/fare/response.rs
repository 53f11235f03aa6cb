use itertools::Itertools;
use serde::Serialize;

use crate::{
    directory::StationDirectory,
    fare::{
        resolve::{Candidate, MatchQuality},
        search::RouteResult,
    },
    odpt::{fare::Fares, station::StationId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    From,
    To,
}

/// One side of a fare request after name resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub input: String,
    pub candidates: Vec<Candidate>,
}

impl Resolved {
    pub fn new(input: &str, candidates: Vec<Candidate>) -> Self {
        Self {
            input: input.to_owned(),
            candidates,
        }
    }

    pub fn is_found(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// The selected display name, or the input as typed when nothing matched.
    pub fn name(&self) -> &str {
        self.candidates
            .first()
            .map_or(self.input.as_str(), |c| c.name.as_str())
    }

    /// Nothing matched exactly and the matches span several names.
    pub fn is_ambiguous(&self) -> bool {
        match self.candidates.first() {
            Some(top) if top.rank.quality != MatchQuality::Exact => {
                self.candidates.iter().map(|c| &c.name).unique().count() > 1
            }
            _ => false,
        }
    }
}

/// How a fare request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FareOutcome {
    NotFound(Vec<Side>),
    Ambiguous(Vec<Side>),
    Direct {
        from: StationId,
        to: StationId,
        fares: Fares,
    },
    Route(RouteResult),
    NoFareData {
        same_railway: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FareStatus {
    Direct,
    Route,
    NotFound,
    NoFareData,
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternate {
    pub name: String,
    pub station_id: StationId,
    pub railway: String,
}

impl From<&Candidate> for Alternate {
    fn from(c: &Candidate) -> Self {
        Self {
            name: c.name.clone(),
            station_id: c.station_id.clone(),
            railway: c.railway.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareResponse {
    pub status: FareStatus,
    pub from_name: String,
    pub to_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fares: Option<Fares>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternates_from: Vec<Alternate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternates_to: Vec<Alternate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_found: Vec<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_railway: Option<String>,
}

fn alternates(side: &Resolved, used: Option<&StationId>) -> Vec<Alternate> {
    let skip = used.or(side.candidates.first().map(|c| &c.station_id));
    side.candidates
        .iter()
        .filter(|c| Some(&c.station_id) != skip)
        .map(Alternate::from)
        .collect()
}

/// Station names along a route, with same-named transfer stops collapsed.
pub fn route_names(directory: &StationDirectory, route: &RouteResult) -> Vec<String> {
    route
        .stations
        .iter()
        .map(|id| directory.display_name(id))
        .dedup()
        .collect()
}

pub fn assemble(
    directory: &StationDirectory,
    from: &Resolved,
    to: &Resolved,
    outcome: &FareOutcome,
) -> FareResponse {
    let mut response = FareResponse {
        status: FareStatus::NotFound,
        from_name: from.name().to_owned(),
        to_name: to.name().to_owned(),
        fares: None,
        route: None,
        alternates_from: vec![],
        alternates_to: vec![],
        not_found: vec![],
        same_railway: None,
    };

    match outcome {
        FareOutcome::NotFound(sides) => {
            response.not_found = sides.clone();
            response.alternates_from = alternates(from, None);
            response.alternates_to = alternates(to, None);
        }
        FareOutcome::Ambiguous(sides) => {
            response.status = FareStatus::Ambiguous;
            for side in sides {
                let (resolved, list) = match side {
                    Side::From => (from, &mut response.alternates_from),
                    Side::To => (to, &mut response.alternates_to),
                };
                *list = resolved.candidates.iter().map(Alternate::from).collect();
            }
            if !sides.contains(&Side::From) {
                response.alternates_from = alternates(from, None);
            }
            if !sides.contains(&Side::To) {
                response.alternates_to = alternates(to, None);
            }
        }
        FareOutcome::Direct {
            from: from_id,
            to: to_id,
            fares,
        } => {
            response.status = FareStatus::Direct;
            response.fares = Some(*fares);
            response.alternates_from = alternates(from, Some(from_id));
            response.alternates_to = alternates(to, Some(to_id));
        }
        FareOutcome::Route(route) => {
            response.status = FareStatus::Route;
            response.fares = Some(route.fares);
            response.route = Some(route_names(directory, route));
            response.alternates_from = alternates(from, route.stations.first());
            response.alternates_to = alternates(to, route.stations.last());
        }
        FareOutcome::NoFareData { same_railway } => {
            response.status = FareStatus::NoFareData;
            response.same_railway = same_railway.clone();
            response.alternates_from = alternates(from, None);
            response.alternates_to = alternates(to, None);
        }
    }

    response
}
