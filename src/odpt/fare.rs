use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::odpt::station::StationId;

/// The four published fare amounts, in yen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Fares {
    pub ic: u32,
    pub ticket: u32,
    pub child_ic: u32,
    pub child_ticket: u32,
}

impl Fares {
    pub const ZERO: Fares = Fares {
        ic: 0,
        ticket: 0,
        child_ic: 0,
        child_ticket: 0,
    };

    pub fn new(ic: u32, ticket: u32, child_ic: u32, child_ticket: u32) -> Self {
        Self {
            ic,
            ticket,
            child_ic,
            child_ticket,
        }
    }
}

impl Add for Fares {
    type Output = Fares;

    fn add(self, rhs: Fares) -> Fares {
        Fares {
            ic: self.ic.saturating_add(rhs.ic),
            ticket: self.ticket.saturating_add(rhs.ticket),
            child_ic: self.child_ic.saturating_add(rhs.child_ic),
            child_ticket: self.child_ticket.saturating_add(rhs.child_ticket),
        }
    }
}

/// A published fare between two stations, valid in both directions.
#[derive(Debug, Clone)]
pub struct FareSegment {
    pub from: StationId,
    pub to: StationId,
    pub fares: Fares,
}

impl FareSegment {
    pub fn new(from: StationId, to: StationId, fares: Fares) -> Self {
        Self { from, to, fares }
    }

    pub fn connects(&self, a: &StationId, b: &StationId) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawFare {
    #[serde(rename = "odpt:fromStation")]
    from_station: Option<String>,
    #[serde(rename = "odpt:toStation")]
    to_station: Option<String>,
    #[serde(rename = "odpt:icCardFare")]
    ic_card_fare: Option<u32>,
    #[serde(rename = "odpt:ticketFare")]
    ticket_fare: Option<u32>,
    #[serde(rename = "odpt:childIcCardFare")]
    child_ic_card_fare: Option<u32>,
    #[serde(rename = "odpt:childTicketFare")]
    child_ticket_fare: Option<u32>,
}

impl RawFare {
    pub(super) fn into_segment(self) -> Option<FareSegment> {
        let from = self.from_station.filter(|s| !s.is_empty())?;
        let to = self.to_station.filter(|s| !s.is_empty())?;
        if from == to {
            return None;
        }

        let fares = Fares::new(
            self.ic_card_fare.unwrap_or(0),
            self.ticket_fare.unwrap_or(0),
            self.child_ic_card_fare.unwrap_or(0),
            self.child_ticket_fare.unwrap_or(0),
        );
        Some(FareSegment::new(
            StationId::new(&from),
            StationId::new(&to),
            fares,
        ))
    }
}
