//! Client address enrichment.
//!
//! Lookups run inline while a summary is built. Implementations may fail; the
//! aggregator treats every failure as "not found" so one bad address never
//! costs more than its own enrichment fields.

use serde::Serialize;
use thiserror::Error;

/// Enrichment lookup failures.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("invalid client address: {0}")]
    InvalidAddress(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Geographic details for a client address.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoInfo {
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal_code: Option<String>,
    pub metro_code: Option<u16>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
}

/// Address to organization and address to geo lookups.
///
/// `Ok(None)` means the address is unknown or the lookup is not configured.
pub trait Enricher: Send + Sync {
    fn lookup_organization(&self, address: &str) -> Result<Option<String>, EnrichError>;

    fn lookup_geo(&self, address: &str) -> Result<Option<GeoInfo>, EnrichError>;
}

/// Enricher that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

impl Enricher for NoopEnricher {
    fn lookup_organization(&self, _address: &str) -> Result<Option<String>, EnrichError> {
        Ok(None)
    }

    fn lookup_geo(&self, _address: &str) -> Result<Option<GeoInfo>, EnrichError> {
        Ok(None)
    }
}

/// Organization for `address`, with failures folded into `None`.
pub fn organization_or_none(enricher: &dyn Enricher, address: &str) -> Option<String> {
    enricher
        .lookup_organization(address)
        .unwrap_or_else(|e| {
            tracing::debug!(address, error = %e, "organization lookup failed");
            None
        })
}

/// Geo details for `address`, with failures folded into `None`.
pub fn geo_or_none(enricher: &dyn Enricher, address: &str) -> Option<GeoInfo> {
    enricher.lookup_geo(address).unwrap_or_else(|e| {
        tracing::debug!(address, error = %e, "geo lookup failed");
        None
    })
}
