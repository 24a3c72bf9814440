//! Geo Tracker — cached, best-effort IP geolocation.
//!
//! The block/allow decision never waits on a lookup: the hot path reads the
//! cache only, and a miss means "unknown location". `refresh` performs the
//! actual resolution and belongs in background sweeps; the bundled resolver
//! queries ip-api.com with a short deadline and treats any failure as
//! unknown. Private and loopback addresses are never sent out.

use crate::types::GeoInfo;
use palisade_core::expiry::ExpiringMap;
use palisade_core::{PalisadeError, PalisadeResult};
use parking_lot::Mutex;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{info, warn};

const CACHE_CAPACITY: usize = 50_000;

/// Collaborator that maps an IP to its location. Implementations are
/// expected to enforce their own deadline.
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, ip: &str) -> PalisadeResult<GeoInfo>;
}

// ── ip-api.com resolver ──────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(rename = "countryCode", default)]
    country_code: Option<String>,
    #[serde(rename = "regionName", default)]
    region_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    org: Option<String>,
    #[serde(rename = "as", default)]
    asn: Option<String>,
    #[serde(default)]
    mobile: Option<bool>,
    #[serde(default)]
    proxy: Option<bool>,
    #[serde(default)]
    hosting: Option<bool>,
}

pub struct IpApiResolver {
    client: reqwest::blocking::Client,
}

impl IpApiResolver {
    pub fn new(timeout: Duration) -> PalisadeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PalisadeError::CollaboratorUnavailable(e.to_string()))?;
        Ok(Self { client })
    }
}

impl GeoResolver for IpApiResolver {
    fn resolve(&self, ip: &str) -> PalisadeResult<GeoInfo> {
        let url = format!(
            "http://ip-api.com/json/{}?fields=status,message,country,countryCode,\
             regionName,city,lat,lon,timezone,isp,org,as,mobile,proxy,hosting",
            ip
        );
        let resp: IpApiResponse = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.json())
            .map_err(|e| PalisadeError::CollaboratorUnavailable(e.to_string()))?;

        if resp.status != "success" {
            return Err(PalisadeError::CollaboratorUnavailable(
                resp.message.unwrap_or_else(|| "lookup failed".into()),
            ));
        }

        Ok(GeoInfo {
            ip: ip.to_string(),
            country: resp.country.unwrap_or_else(|| "Unknown".into()),
            country_code: resp.country_code.unwrap_or_else(|| "Unknown".into()),
            region: resp.region_name.unwrap_or_else(|| "Unknown".into()),
            city: resp.city.unwrap_or_else(|| "Unknown".into()),
            lat: resp.lat.unwrap_or(0.0),
            lon: resp.lon.unwrap_or(0.0),
            timezone: resp.timezone.unwrap_or_else(|| "Unknown".into()),
            isp: resp.isp.unwrap_or_else(|| "Unknown".into()),
            org: resp.org.unwrap_or_else(|| "Unknown".into()),
            asn: resp.asn.unwrap_or_else(|| "Unknown".into()),
            mobile: resp.mobile.unwrap_or(false),
            proxy: resp.proxy.unwrap_or(false),
            hosting: resp.hosting.unwrap_or(false),
        })
    }
}

// ── Tracker ──────────────────────────────────────────────────────────────────

pub struct GeoTracker {
    cache: Mutex<ExpiringMap<String, GeoInfo>>,
    resolver: Option<Box<dyn GeoResolver>>,
    total_lookups: AtomicU64,
    total_failures: AtomicU64,
    enabled: bool,
}

impl GeoTracker {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(ExpiringMap::new(CACHE_CAPACITY, cache_ttl)),
            resolver: None,
            total_lookups: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            enabled: true,
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn GeoResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Cache-only read for the hot path. A miss is "unknown location",
    /// never a blocking lookup.
    pub fn cached(&self, ip: &str) -> Option<GeoInfo> {
        if !self.enabled {
            return None;
        }
        self.cache.lock().get(&ip.to_string()).cloned()
    }

    /// Resolve and cache one identity's location. Belongs in background
    /// sweeps; failures degrade to None with a log line.
    pub fn refresh(&self, ip: &str) -> Option<GeoInfo> {
        if !self.enabled || is_private_ip(ip) {
            return None;
        }
        if let Some(hit) = self.cached(ip) {
            return Some(hit);
        }
        let resolver = self.resolver.as_ref()?;
        self.total_lookups.fetch_add(1, Ordering::Relaxed);
        match resolver.resolve(ip) {
            Ok(geo) => {
                info!(ip = %ip, country = %geo.country, city = %geo.city, "Geolocation resolved");
                self.cache.lock().insert(ip.to_string(), geo.clone());
                Some(geo)
            }
            Err(e) => {
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                warn!(ip = %ip, error = %e, "Geolocation lookup failed");
                None
            }
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn total_lookups(&self) -> u64 {
        self.total_lookups.load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&mut self, e: bool) {
        self.enabled = e;
    }
}

/// Addresses that must never leave the machine for resolution.
pub fn is_private_ip(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        Ok(IpAddr::V6(v6)) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique-local and fe80::/10 link-local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
        Err(_) => true,
    }
}
