//! Cache-first tower resolution.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::TowerCache;
use crate::connectivity::Connectivity;
use crate::model::{Resolution, Source, TowerId, TowerLocation};
use crate::remote::CellLocator;

/// Resolves tower identities to coordinates, trying the local cache before
/// the remote service and feeding remote answers back into the cache.
///
/// All collaborators are injected at construction; the resolver keeps no
/// per-call state.
pub struct TowerResolver {
    cache: TowerCache,
    locator: Arc<dyn CellLocator>,
    connectivity: Arc<dyn Connectivity>,
}

impl TowerResolver {
    pub fn new(
        cache: TowerCache,
        locator: Arc<dyn CellLocator>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            cache,
            locator,
            connectivity,
        }
    }

    /// Resolve one tower. Internal faults are folded into the returned
    /// `Resolution`; this never errors and never panics.
    pub async fn resolve(&self, tower: TowerId) -> Resolution {
        // a broken cache must not block the network path
        match self.cache.lookup(tower).await {
            Ok(Some(hit)) => {
                debug!("cache hit for {tower}");
                return Resolution::Found {
                    lat: hit.lat,
                    lon: hit.lon,
                    source: Source::Cache,
                };
            }
            Ok(None) => {}
            Err(e) => warn!("cache lookup for {tower} failed, treating as miss: {e:#}"),
        }

        if !self.connectivity.is_online().await {
            debug!("offline, not querying remote service for {tower}");
            return Resolution::NetworkUnavailable;
        }

        match self.locator.locate(tower).await {
            Ok(Some(fix)) => {
                let location = TowerLocation {
                    tower,
                    lat: fix.lat,
                    lon: fix.lon,
                };
                // write-back is best effort; the caller still gets the fix
                if let Err(e) = self.cache.insert(&location).await {
                    warn!("failed to cache position for {tower}: {e:#}");
                }
                Resolution::Found {
                    lat: fix.lat,
                    lon: fix.lon,
                    source: Source::Remote,
                }
            }
            Ok(None) => Resolution::NotFound,
            Err(e) => Resolution::RemoteError {
                detail: e.to_string(),
            },
        }
    }
}
