//! MaxMind-backed client enrichment.
//!
//! Two optional databases: an ISP database for the organization name and a
//! City database for geo details. A database that is not configured simply
//! finds nothing.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use maxminddb::{MaxMindDBError, Reader, geoip2};
use vsc_core::enrich::{EnrichError, Enricher, GeoInfo};

#[derive(Debug, thiserror::Error)]
pub enum GeoIpError {
    #[error("GeoIP database not found at path: {0}")]
    DatabaseNotFound(PathBuf),

    #[error("failed to open GeoIP database {path}: {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: MaxMindDBError,
    },

    #[error("failed to look up IP address: {0}")]
    Lookup(#[source] MaxMindDBError),

    #[error("invalid IP address: {0}")]
    InvalidIp(String),
}

impl From<GeoIpError> for EnrichError {
    fn from(err: GeoIpError) -> Self {
        match err {
            GeoIpError::InvalidIp(address) => Self::InvalidAddress(address),
            other => Self::Lookup(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoIpError>;

/// Organization and geo lookups over MaxMind databases.
#[derive(Default)]
pub struct MaxMindEnricher {
    isp: Option<Reader<Vec<u8>>>,
    city: Option<Reader<Vec<u8>>>,
}

impl fmt::Debug for MaxMindEnricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxMindEnricher")
            .field("isp", &self.isp.as_ref().map(|r| &r.metadata.database_type))
            .field("city", &self.city.as_ref().map(|r| &r.metadata.database_type))
            .finish()
    }
}

impl MaxMindEnricher {
    /// Opens whichever databases are given.
    pub fn open(isp: Option<&Path>, city: Option<&Path>) -> Result<Self> {
        Ok(Self {
            isp: isp.map(open_reader).transpose()?,
            city: city.map(open_reader).transpose()?,
        })
    }

    pub const fn is_configured(&self) -> bool {
        self.isp.is_some() || self.city.is_some()
    }

    /// Organization name for `ip`, falling back to the ISP name.
    pub fn organization(&self, ip: IpAddr) -> Result<Option<String>> {
        let Some(reader) = &self.isp else {
            return Ok(None);
        };
        let Some(record) = found(reader.lookup::<geoip2::Isp>(ip))? else {
            return Ok(None);
        };
        Ok(record.organization.or(record.isp).map(String::from))
    }

    /// Geo details for `ip`, with English place names.
    pub fn geo(&self, ip: IpAddr) -> Result<Option<GeoInfo>> {
        let Some(reader) = &self.city else {
            return Ok(None);
        };
        let Some(city) = found(reader.lookup::<geoip2::City>(ip))? else {
            return Ok(None);
        };

        let location = city.location.as_ref();
        Ok(Some(GeoInfo {
            city: city
                .city
                .and_then(|c| c.names)
                .and_then(|n| n.get("en").copied())
                .map(String::from),
            latitude: location.and_then(|l| l.latitude),
            longitude: location.and_then(|l| l.longitude),
            postal_code: city.postal.and_then(|p| p.code).map(String::from),
            metro_code: location.and_then(|l| l.metro_code),
            country_code: city
                .country
                .as_ref()
                .and_then(|c| c.iso_code)
                .map(String::from),
            country_name: city
                .country
                .as_ref()
                .and_then(|c| c.names.as_ref())
                .and_then(|n| n.get("en").copied())
                .map(String::from),
        }))
    }
}

impl Enricher for MaxMindEnricher {
    fn lookup_organization(&self, address: &str) -> std::result::Result<Option<String>, EnrichError> {
        Ok(self.organization(parse_ip(address)?)?)
    }

    fn lookup_geo(&self, address: &str) -> std::result::Result<Option<GeoInfo>, EnrichError> {
        Ok(self.geo(parse_ip(address)?)?)
    }
}

fn open_reader(path: &Path) -> Result<Reader<Vec<u8>>> {
    if !path.exists() {
        return Err(GeoIpError::DatabaseNotFound(path.to_path_buf()));
    }
    let reader = Reader::open_readfile(path).map_err(|source| GeoIpError::DatabaseOpen {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        database_type = %reader.metadata.database_type,
        "GeoIP database loaded"
    );
    Ok(reader)
}

fn parse_ip(address: &str) -> Result<IpAddr> {
    address
        .trim()
        .parse()
        .map_err(|_| GeoIpError::InvalidIp(address.to_string()))
}

/// Maps "address not in database" to `None`.
fn found<T>(lookup: std::result::Result<T, MaxMindDBError>) -> Result<Option<T>> {
    match lookup {
        Ok(record) => Ok(Some(record)),
        Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
        Err(e) => Err(GeoIpError::Lookup(e)),
    }
}
