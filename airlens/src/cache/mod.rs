//! Caching decorator for station sources.
//!
//! [`CachedStationSource`] wraps any [`StationSource`] with a `moka` future
//! cache. Queries are keyed by coordinate rounded to two decimal places
//! (about 1 km) plus the search radius, so nearby repeat requests within the
//! TTL skip the fetch. Only successful fetches are cached.
//!
//! The estimation core stays stateless; a caller opts in by wrapping its
//! source before handing it to the orchestrator, directly or through the
//! `[cache]` settings with [`CachedStationSource::wrap_if_enabled`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::config::CacheSettings;
use crate::coord::GeoPoint;
use crate::orchestrator::{BoxFuture, SourceError, StationSource};
use crate::tier::StationReading;

/// Default time-to-live for cached station lists.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of cached locations.
pub const DEFAULT_MAX_ENTRIES: u64 = 1000;

/// Station source with a TTL cache in front.
pub struct CachedStationSource {
    inner: Arc<dyn StationSource>,
    cache: Cache<String, Arc<Vec<StationReading>>>,
}

impl CachedStationSource {
    /// Wrap `inner` with the given TTL and capacity.
    pub fn new(inner: Arc<dyn StationSource>, ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    /// Wrap `inner` using `[cache]` settings.
    pub fn from_settings(inner: Arc<dyn StationSource>, settings: &CacheSettings) -> Self {
        Self::new(inner, settings.ttl(), settings.max_entries)
    }

    /// Wrap `inner` when `settings.enabled`, else hand it back untouched.
    pub fn wrap_if_enabled(
        inner: Arc<dyn StationSource>,
        settings: &CacheSettings,
    ) -> Arc<dyn StationSource> {
        if settings.enabled {
            debug!(
                ttl_secs = settings.ttl_secs,
                max_entries = settings.max_entries,
                "Station cache enabled"
            );
            Arc::new(Self::from_settings(inner, settings))
        } else {
            inner
        }
    }

    /// Cache key for a query.
    pub fn cache_key(point: GeoPoint, radius_km: f64) -> String {
        format!("{:.2}_{:.2}_{:.1}", point.lat, point.lon, radius_km)
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of cached locations.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl StationSource for CachedStationSource {
    fn nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<StationReading>, SourceError>> {
        Box::pin(async move {
            let key = Self::cache_key(point, radius_km);
            if let Some(hit) = self.cache.get(&key).await {
                debug!(key = %key, stations = hit.len(), "Station cache hit");
                return Ok(hit.as_ref().clone());
            }

            let readings = self.inner.nearby(point, radius_km).await?;
            debug!(key = %key, stations = readings.len(), "Station cache miss, stored");
            self.cache.insert(key, Arc::new(readings.clone())).await;
            Ok(readings)
        })
    }
}
