use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::{Duration, Instant},
};

use geo_types::Point;
use itertools::Itertools;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::FeedError,
    odpt::{
        fare::FareSegment,
        station::{StationId, StationRecord},
        TransitSource,
    },
};

const AUTOCOMPLETE_LIMIT: usize = 25;

#[derive(Serialize)]
struct StationFeature<'a> {
    id: &'a StationId,
    name: &'a str,
    railway: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(serialize_with = "geojson::ser::serialize_geometry")]
    geometry: Point,
}

/// Read-only set of stations, loaded once from the station feed.
#[derive(Debug, Default)]
pub struct StationDirectory {
    stations: Vec<StationRecord>,
    by_id: HashMap<StationId, usize>,
}

impl StationDirectory {
    pub fn new(stations: Vec<StationRecord>) -> Self {
        let mut by_id = HashMap::new();
        for (i, s) in stations.iter().enumerate() {
            by_id.entry(s.id.clone()).or_insert(i);
        }

        Self { stations, by_id }
    }

    pub fn stations(&self) -> &[StationRecord] {
        &self.stations
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, id: &StationId) -> Option<&StationRecord> {
        self.by_id.get(id).map(|&i| &self.stations[i])
    }

    /// Every station id whose display name is `name`, in feed order.
    pub fn ids_named(&self, name: &str) -> Vec<StationId> {
        self.stations
            .iter()
            .filter(|s| s.display_name() == name)
            .map(|s| s.id.clone())
            .unique()
            .collect()
    }

    /// Display name for an id, falling back to the id's last component for
    /// stations only known from the fare feed.
    pub fn display_name(&self, id: &StationId) -> String {
        match self.get(id) {
            Some(s) => s.display_name().to_owned(),
            None => id.short_name().to_owned(),
        }
    }

    /// Distinct display names containing `current`, for chat autocomplete.
    pub fn autocomplete(&self, current: &str) -> Vec<String> {
        let current = current.to_lowercase();
        self.stations
            .iter()
            .map(|s| s.display_name())
            .unique()
            .sorted()
            .filter(|name| current.is_empty() || name.to_lowercase().contains(&current))
            .take(AUTOCOMPLETE_LIMIT)
            .map(str::to_owned)
            .collect()
    }

    /// A GeoJSON FeatureCollection of `ids`. Stations without coordinates are
    /// left out.
    pub fn to_geojson<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a StationId>,
    ) -> Result<String, geojson::Error> {
        let features: Vec<StationFeature> = ids
            .into_iter()
            .filter_map(|id| self.get(id))
            .filter_map(|s| {
                Some(StationFeature {
                    id: &s.id,
                    name: s.display_name(),
                    railway: &s.railway,
                    code: s.station_code.as_deref(),
                    geometry: s.coord?,
                })
            })
            .collect();

        geojson::ser::to_feature_collection_string(&features)
    }
}

struct FareSnapshot {
    segments: Arc<Vec<FareSegment>>,
    fetched_at: Instant,
}

/// Holds the station directory and the latest fare snapshot for a source.
///
/// Readers get `Arc` snapshots, so a refresh never changes the data under an
/// in-flight search.
pub struct FeedCache<S> {
    source: S,
    fare_ttl: Duration,
    directory: RwLock<Option<Arc<StationDirectory>>>,
    fares: RwLock<Option<FareSnapshot>>,
}

impl<S: TransitSource> FeedCache<S> {
    pub fn new(source: S, fare_ttl: Duration) -> Self {
        Self {
            source,
            fare_ttl,
            directory: RwLock::new(None),
            fares: RwLock::new(None),
        }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn directory(&self) -> Result<Arc<StationDirectory>, FeedError> {
        if let Some(directory) = self
            .directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(directory.clone());
        }

        self.load_directory()
    }

    pub fn fare_segments(&self) -> Result<Arc<Vec<FareSegment>>, FeedError> {
        if let Some(snapshot) = self
            .fares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            if snapshot.fetched_at.elapsed() < self.fare_ttl {
                return Ok(snapshot.segments.clone());
            }
        }

        self.load_fares()
    }

    /// Re-fetches both feeds, replacing the cached snapshots.
    pub fn refresh(&self) -> Result<(), FeedError> {
        self.load_directory()?;
        self.load_fares()?;
        Ok(())
    }

    pub fn invalidate(&self) {
        *self.directory.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.fares.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn load_directory(&self) -> Result<Arc<StationDirectory>, FeedError> {
        let directory = Arc::new(StationDirectory::new(self.source.fetch_station_directory()?));
        if directory.is_empty() {
            warn!("Station feed returned no stations");
            return Ok(directory);
        }

        info!("Loaded {} stations", directory.stations().len());
        *self.directory.write().unwrap_or_else(PoisonError::into_inner) = Some(directory.clone());
        Ok(directory)
    }

    fn load_fares(&self) -> Result<Arc<Vec<FareSegment>>, FeedError> {
        let segments = Arc::new(self.source.fetch_fare_segments()?);
        info!("Loaded {} fare segments", segments.len());

        *self.fares.write().unwrap_or_else(PoisonError::into_inner) = Some(FareSnapshot {
            segments: segments.clone(),
            fetched_at: Instant::now(),
        });
        Ok(segments)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::odpt::fare::Fares;

    /// In-memory source that counts how often each feed is fetched.
    pub(crate) struct FixtureSource {
        pub stations: Vec<StationRecord>,
        pub segments: Vec<FareSegment>,
        pub station_fetches: AtomicUsize,
        pub fare_fetches: AtomicUsize,
    }

    impl FixtureSource {
        pub(crate) fn new(stations: Vec<StationRecord>, segments: Vec<FareSegment>) -> Self {
            Self {
                stations,
                segments,
                station_fetches: AtomicUsize::new(0),
                fare_fetches: AtomicUsize::new(0),
            }
        }
    }

    impl TransitSource for FixtureSource {
        fn fetch_station_directory(&self) -> Result<Vec<StationRecord>, FeedError> {
            self.station_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.stations.clone())
        }

        fn fetch_fare_segments(&self) -> Result<Vec<FareSegment>, FeedError> {
            self.fare_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.segments.clone())
        }
    }

    fn station(id: &str, name: &str, railway: &str) -> StationRecord {
        StationRecord::new(StationId::new(id), name, railway)
    }

    fn fixture() -> FixtureSource {
        FixtureSource::new(
            vec![
                station("g.shibuya", "Shibuya", "Ginza"),
                station("z.shibuya", "Shibuya", "Hanzomon"),
                station("g.ginza", "Ginza", "Ginza"),
            ],
            vec![FareSegment::new(
                StationId::new("g.shibuya"),
                StationId::new("g.ginza"),
                Fares::new(209, 210, 104, 105),
            )],
        )
    }

    #[test]
    fn ids_named_covers_every_line() {
        let directory = StationDirectory::new(fixture().stations);
        assert_eq!(
            directory.ids_named("Shibuya"),
            vec![StationId::new("g.shibuya"), StationId::new("z.shibuya")]
        );
        assert!(directory.ids_named("Ikebukuro").is_empty());
    }

    #[test]
    fn unknown_id_uses_short_name() {
        let directory = StationDirectory::new(vec![]);
        assert_eq!(
            directory.display_name(&StationId::new("odpt.Station:Toei.Mita.Mita")),
            "Mita"
        );
    }

    #[test]
    fn autocomplete_is_distinct_and_sorted() {
        let directory = StationDirectory::new(fixture().stations);
        assert_eq!(directory.autocomplete(""), vec!["Ginza", "Shibuya"]);
        assert_eq!(directory.autocomplete("shi"), vec!["Shibuya"]);
    }

    #[test]
    fn geojson_skips_stations_without_coordinates() {
        let mut stations = fixture().stations;
        stations[0].coord = Some(Point::new(139.701, 35.659));
        stations[0].station_code = Some("G01".to_owned());
        let directory = StationDirectory::new(stations);

        let ids = [StationId::new("g.shibuya"), StationId::new("z.shibuya")];
        let json: serde_json::Value =
            serde_json::from_str(&directory.to_geojson(&ids).unwrap()).unwrap();

        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["name"], "Shibuya");
        assert_eq!(features[0]["properties"]["code"], "G01");
        assert_eq!(features[0]["geometry"]["type"], "Point");
    }

    #[test]
    fn directory_is_fetched_once() {
        let cache = FeedCache::new(fixture(), Duration::from_secs(60));
        cache.directory().unwrap();
        cache.directory().unwrap();
        assert_eq!(cache.source().station_fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_fares_are_refetched() {
        let cache = FeedCache::new(fixture(), Duration::ZERO);
        cache.fare_segments().unwrap();
        cache.fare_segments().unwrap();
        assert_eq!(cache.source().fare_fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidate_forces_reload() {
        let cache = FeedCache::new(fixture(), Duration::from_secs(60));
        cache.directory().unwrap();
        cache.fare_segments().unwrap();
        cache.invalidate();
        cache.directory().unwrap();
        cache.fare_segments().unwrap();
        assert_eq!(cache.source().station_fetches.load(Ordering::SeqCst), 2);
        assert_eq!(cache.source().fare_fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn snapshot_survives_refresh() {
        let cache = FeedCache::new(fixture(), Duration::from_secs(60));
        let before = cache.fare_segments().unwrap();
        cache.refresh().unwrap();
        let after = cache.fare_segments().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.len(), 1);
    }
}
