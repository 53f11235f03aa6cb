pub mod graph;
pub mod resolve;
pub mod response;
pub mod search;

use std::{ops::Deref, time::Duration};

use tracing::debug;

use crate::{
    config::Config,
    directory::{FeedCache, StationDirectory},
    error::FeedError,
    fare::{
        graph::FareGraph,
        resolve::{resolve, Candidate},
        response::{assemble, FareOutcome, FareResponse, Resolved, Side},
        search::find_cheapest,
    },
    odpt::{
        fare::{FareSegment, Fares},
        station::StationId,
        OdptClient, TransitSource,
    },
};

/// Both sides of a fare request, resolved against the station directory.
pub struct FareQuery {
    pub from: Resolved,
    pub to: Resolved,
}

impl FareQuery {
    pub fn new(directory: &StationDirectory, from_text: &str, to_text: &str) -> Self {
        Self {
            from: Resolved::new(from_text, resolve(directory, from_text)),
            to: Resolved::new(to_text, resolve(directory, to_text)),
        }
    }

    fn sides(&self) -> [(Side, &Resolved); 2] {
        [(Side::From, &self.from), (Side::To, &self.to)]
    }

    /// The outcome when the query can't be priced at all.
    pub fn unpriced(&self) -> Option<FareOutcome> {
        let missing: Vec<Side> = self
            .sides()
            .into_iter()
            .filter(|(_, r)| !r.is_found())
            .map(|(side, _)| side)
            .collect();
        if !missing.is_empty() {
            return Some(FareOutcome::NotFound(missing));
        }

        let ambiguous: Vec<Side> = self
            .sides()
            .into_iter()
            .filter(|(_, r)| r.is_ambiguous())
            .map(|(side, _)| side)
            .collect();
        if !ambiguous.is_empty() {
            return Some(FareOutcome::Ambiguous(ambiguous));
        }

        None
    }

    pub fn price(&self, directory: &StationDirectory, segments: &[FareSegment]) -> FareOutcome {
        let from_ids = directory.ids_named(self.from.name());
        let to_ids = directory.ids_named(self.to.name());

        // No fare is published for a trip to the station you're already at.
        if from_ids == to_ids {
            return FareOutcome::NoFareData {
                same_railway: shared_railway(directory, &from_ids, &to_ids),
            };
        }

        if let Some((from, to, fares)) = direct_fare(segments, &from_ids, &to_ids) {
            return FareOutcome::Direct { from, to, fares };
        }

        let graph = FareGraph::build(segments, directory.stations());
        debug!(
            "Searching {} nodes, {} edges from {from_ids:?} to {to_ids:?}",
            graph.nodes(),
            graph.edge_count()
        );

        match find_cheapest(&graph, &from_ids, &to_ids) {
            Some(route) => {
                debug!("Cheapest route costs {} yen", route.primary_cost());
                for &leg in &route.legs {
                    let edge = graph.edge(leg);
                    debug!(
                        "  {} -> {} ({:?}, {} yen)",
                        graph.id(edge.from),
                        graph.id(edge.to),
                        edge.kind,
                        edge.fares.ic
                    );
                }
                FareOutcome::Route(route)
            }
            None => FareOutcome::NoFareData {
                same_railway: shared_railway(directory, &from_ids, &to_ids),
            },
        }
    }
}

/// First published segment between any source and destination pair.
fn direct_fare(
    segments: &[FareSegment],
    from_ids: &[StationId],
    to_ids: &[StationId],
) -> Option<(StationId, StationId, Fares)> {
    from_ids.iter().find_map(|from| {
        to_ids.iter().find_map(|to| {
            segments
                .iter()
                .find(|s| s.connects(from, to))
                .map(|s| (from.clone(), to.clone(), s.fares))
        })
    })
}

fn shared_railway(
    directory: &StationDirectory,
    from_ids: &[StationId],
    to_ids: &[StationId],
) -> Option<String> {
    let railways = |ids: &[StationId]| -> Vec<String> {
        ids.iter()
            .filter_map(|id| directory.get(id))
            .map(|s| s.railway.clone())
            .filter(|r| !r.is_empty())
            .collect()
    };

    let to_railways = railways(to_ids);
    railways(from_ids)
        .into_iter()
        .find(|r| to_railways.contains(r))
}

/// Resolves both names and prices the trip between them.
///
/// `segments` is only called once both names resolve to a single station
/// name, so an unresolvable request never touches the fare feed.
pub fn find_fare<F, S>(
    directory: &StationDirectory,
    from_text: &str,
    to_text: &str,
    segments: F,
) -> Result<FareResponse, FeedError>
where
    F: FnOnce() -> Result<S, FeedError>,
    S: Deref<Target = Vec<FareSegment>>,
{
    let query = FareQuery::new(directory, from_text, to_text);
    let outcome = match query.unpriced() {
        Some(outcome) => outcome,
        None => query.price(directory, segments()?.as_slice()),
    };
    Ok(assemble(directory, &query.from, &query.to, &outcome))
}

/// Fare lookups backed by a feed cache. Fares are only fetched once both
/// names resolve.
pub struct FareService<S> {
    cache: FeedCache<S>,
}

impl FareService<OdptClient> {
    pub fn from_config(config: &Config) -> Self {
        let cache = FeedCache::new(
            OdptClient::new(config),
            Duration::from_secs(config.fare_cache_ttl_secs),
        );
        Self::new(cache)
    }
}

impl<S: TransitSource> FareService<S> {
    pub fn new(cache: FeedCache<S>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &FeedCache<S> {
        &self.cache
    }

    pub fn resolve(&self, text: &str) -> Result<Vec<Candidate>, FeedError> {
        let directory = self.cache.directory()?;
        Ok(resolve(&directory, text))
    }

    pub fn autocomplete(&self, current: &str) -> Result<Vec<String>, FeedError> {
        Ok(self.cache.directory()?.autocomplete(current))
    }

    pub fn find_fare(&self, from_text: &str, to_text: &str) -> Result<FareResponse, FeedError> {
        let directory = self.cache.directory()?;
        find_fare(&directory, from_text, to_text, || self.cache.fare_segments())
    }
}
