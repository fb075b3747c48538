//! # Occurrence Map
//!
//! Map clustering, backend access and offline queueing for citizen occurrence reports.
//!
//! This library provides:
//! - Anchor-relative proximity clustering of geotagged occurrences for map markers
//! - Marker projection (plain vs. badge markers, status sets, viewport bounds)
//! - An async client for the occurrence backend
//! - A SQLite queue for drafts captured while offline
//!
//! ## Features
//!
//! - **`parallel`** - Cluster several zoom-level radii in parallel with rayon
//! - **`serde`** - Serialize/deserialize the data model with the backend's wire names
//! - **`http`** - Enable the HTTP client for the occurrence backend
//! - **`offline`** - Enable the SQLite offline draft queue
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use occurrence_map::{cluster_occurrences, to_markers, MarkerKind, Occurrence, OccurrenceStatus};
//!
//! let occurrences = vec![
//!     Occurrence::new("a", -15.5369, -47.3316, OccurrenceStatus::Open),
//!     Occurrence::new("b", -15.5369, -47.3316, OccurrenceStatus::Closed),
//!     Occurrence::new("c", -15.6000, -47.4000, OccurrenceStatus::Open),
//! ];
//!
//! let clusters = cluster_occurrences(&occurrences, 200.0);
//! assert_eq!(clusters.len(), 2);
//!
//! let markers = to_markers(&clusters);
//! assert_eq!(markers[0].kind, MarkerKind::Badge);
//! assert_eq!(markers[0].count, 2);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod geo_utils;
pub use geo_utils::{haversine_distance, Bounds, EARTH_RADIUS_METERS};

// Proximity clustering (anchor-relative, order-dependent)
pub mod cluster;
pub use cluster::{
    cluster_occurrences, cluster_zoom_levels, group_by_anchor, retain_clusterable,
    OccurrenceCluster, ZoomLevelClusters,
};

// Cluster-to-marker projection
pub mod markers;
pub use markers::{marker_bounds, single_marker, status_set, to_markers, MapMarker, MarkerKind};

// HTTP module for the occurrence backend
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{
    Category, ClientConfig, NewOccurrence, OccurrenceClient, OccurrenceFilter, OccurrenceUpdate,
    Page, PhotoUpload,
};

// Offline draft queue
#[cfg(feature = "offline")]
pub mod offline;

#[cfg(feature = "offline")]
pub use offline::OfflineStore;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("OccurrenceMapRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use occurrence_map::GeoPoint;
/// let point = GeoPoint::new(-15.7939, -47.8828); // Brasília
/// assert!(point.is_clusterable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Valid and not carrying a zeroed coordinate.
    ///
    /// The backend reports a missing location as `0`/`null`, so either axis being
    /// exactly zero means "no location" rather than a point on the equator.
    pub fn is_clusterable(&self) -> bool {
        self.is_valid() && self.latitude != 0.0 && self.longitude != 0.0
    }
}

/// Workflow status of an occurrence. Only used for marker styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OccurrenceStatus {
    #[cfg_attr(feature = "serde", serde(rename = "ABERTO"))]
    Open,
    #[cfg_attr(feature = "serde", serde(rename = "EM_ANDAMENTO"))]
    InProgress,
    #[cfg_attr(feature = "serde", serde(rename = "FINALIZADO"))]
    Closed,
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "UNKNOWN", other))]
    Unknown,
}

impl OccurrenceStatus {
    /// The value the backend uses for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceStatus::Open => "ABERTO",
            OccurrenceStatus::InProgress => "EM_ANDAMENTO",
            OccurrenceStatus::Closed => "FINALIZADO",
            OccurrenceStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parse a backend status value. Unrecognised values map to `Unknown`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "ABERTO" => OccurrenceStatus::Open,
            "EM_ANDAMENTO" => OccurrenceStatus::InProgress,
            "FINALIZADO" => OccurrenceStatus::Closed,
            _ => OccurrenceStatus::Unknown,
        }
    }
}

/// A citizen-submitted report, as listed by the backend.
///
/// Only `latitude`/`longitude` matter to clustering; the rest is carried through
/// untouched so the map can show it when a marker is tapped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Occurrence {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "id_as_string"))]
    pub id: String,
    #[cfg_attr(feature = "serde", serde(rename = "lat", default, deserialize_with = "null_as_zero"))]
    pub latitude: f64,
    #[cfg_attr(feature = "serde", serde(rename = "lon", default, deserialize_with = "null_as_zero"))]
    pub longitude: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: OccurrenceStatus,
    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "categoryId", deserialize_with = "optional_id_as_string")
    )]
    pub category: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub photo_url: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub created_at: Option<String>,
}

impl Occurrence {
    /// Create an occurrence with no payload fields.
    pub fn new(id: &str, latitude: f64, longitude: f64, status: OccurrenceStatus) -> Self {
        Self {
            id: id.to_string(),
            latitude,
            longitude,
            status,
            category: None,
            description: None,
            photo_url: None,
            created_at: None,
        }
    }

    /// Coordinate of this occurrence.
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[cfg(feature = "serde")]
fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Backend ids may arrive as JSON strings or numbers; both are kept as text.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

#[cfg(feature = "serde")]
impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(text) => text,
            WireId::Unsigned(n) => n.to_string(),
            WireId::Signed(n) => n.to_string(),
        }
    }
}

#[cfg(feature = "serde")]
pub(crate) fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(WireId::deserialize(deserializer)?.into())
}

#[cfg(feature = "serde")]
fn optional_id_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireId>::deserialize(deserializer)?.map(String::from))
}

/// Configuration for map clustering.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClusterConfig {
    /// Merge radius around each anchor, in meters. Must be positive to merge anything.
    /// Default: 200.0 meters
    pub radius_meters: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { radius_meters: 200.0 }
    }
}

/// Local synchronisation state of an offline draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum SyncStatus {
    Pending,
    Synced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Synced => "SYNCED",
        }
    }

    /// Anything other than `SYNCED` is still waiting to be sent.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "SYNCED" => SyncStatus::Synced,
            _ => SyncStatus::Pending,
        }
    }
}

/// An occurrence captured without connectivity, waiting to be uploaded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct OfflineDraft {
    pub id: String,
    pub description: Option<String>,
    pub photo_uri: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "lat"))]
    pub latitude: f64,
    #[cfg_attr(feature = "serde", serde(rename = "lon"))]
    pub longitude: f64,
    pub category_id: Option<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub sync_status: SyncStatus,
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{debug, info};

    /// Default clustering configuration (200m radius).
    #[uniffi::export]
    pub fn default_cluster_config() -> ClusterConfig {
        ClusterConfig::default()
    }

    /// Great-circle distance in meters.
    #[uniffi::export]
    pub fn ffi_haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
        haversine_distance(&a, &b)
    }

    /// Drop occurrences without a usable location, then cluster the rest.
    #[uniffi::export]
    pub fn ffi_cluster_occurrences(
        occurrences: Vec<Occurrence>,
        config: ClusterConfig,
    ) -> Vec<OccurrenceCluster> {
        init_logging();
        let total = occurrences.len();
        let clusterable = retain_clusterable(occurrences);
        let clusters = cluster_occurrences(&clusterable, config.radius_meters);
        info!(
            "[OccurrenceMap] Clustered {} of {} occurrences into {} clusters ({:.0}m radius)",
            clusterable.len(), total, clusters.len(), config.radius_meters
        );
        clusters
    }

    /// Same as `ffi_cluster_occurrences` but returns ready-to-render markers.
    #[uniffi::export]
    pub fn ffi_cluster_markers(
        occurrences: Vec<Occurrence>,
        config: ClusterConfig,
    ) -> Vec<MapMarker> {
        to_markers(&ffi_cluster_occurrences(occurrences, config))
    }

    /// Distinct statuses present in a cluster, in first-seen order.
    #[uniffi::export]
    pub fn ffi_status_set(cluster: OccurrenceCluster) -> Vec<OccurrenceStatus> {
        status_set(&cluster)
    }

    /// Bounds enclosing all markers, for fitting the map viewport.
    #[uniffi::export]
    pub fn ffi_marker_bounds(markers: Vec<MapMarker>) -> Option<Bounds> {
        marker_bounds(&markers)
    }

    /// Marker for a single occurrence opened from a list.
    #[uniffi::export]
    pub fn ffi_single_marker(occurrence: Occurrence) -> MapMarker {
        single_marker(&occurrence)
    }

    /// Cluster once per radius (one radius per zoom level).
    #[uniffi::export]
    pub fn ffi_cluster_zoom_levels(
        occurrences: Vec<Occurrence>,
        radii_meters: Vec<f64>,
    ) -> Vec<ZoomLevelClusters> {
        init_logging();
        let clusterable = retain_clusterable(occurrences);
        debug!(
            "[OccurrenceMap] Clustering {} occurrences at {} zoom levels",
            clusterable.len(), radii_meters.len()
        );
        cluster_zoom_levels(&clusterable, &radii_meters)
    }

    // ========================================================================
    // HTTP
    // ========================================================================

    /// Fetch occurrences matching `filter` and return clustered markers.
    /// Returns an empty list on failure (the error is logged).
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn ffi_fetch_cluster_markers(
        config: ClientConfig,
        filter: OccurrenceFilter,
        cluster_config: ClusterConfig,
    ) -> Vec<MapMarker> {
        init_logging();
        match crate::http::fetch_cluster_markers_blocking(config, filter, cluster_config) {
            Ok(markers) => markers,
            Err(e) => {
                log::warn!("[OccurrenceMap] Failed to fetch clusters: {}", e);
                vec![]
            }
        }
    }

    /// Submit every pending draft in the queue at `db_path`. Returns how many were sent;
    /// failed drafts stay queued.
    #[cfg(all(feature = "http", feature = "offline"))]
    #[uniffi::export]
    pub fn ffi_send_pending_drafts(config: ClientConfig, db_path: String) -> u32 {
        init_logging();
        OfflineStore::open(&db_path)
            .and_then(|store| crate::http::send_pending_blocking(config, &store))
            .unwrap_or_else(|e| {
                log::warn!("[OccurrenceMap] Failed to send offline drafts: {}", e);
                0
            })
    }

    // ========================================================================
    // Offline queue
    // ========================================================================

    /// Build a new pending draft with a fresh id and the current time.
    #[cfg(feature = "offline")]
    #[uniffi::export]
    pub fn ffi_new_draft(
        description: Option<String>,
        photo_uri: Option<String>,
        position: GeoPoint,
        category_id: Option<String>,
    ) -> OfflineDraft {
        OfflineDraft::new(description, photo_uri, position, category_id)
    }

    /// Queue a draft. Returns false if it was already queued or the store failed.
    #[cfg(feature = "offline")]
    #[uniffi::export]
    pub fn ffi_queue_draft(db_path: String, draft: OfflineDraft) -> bool {
        init_logging();
        OfflineStore::open(&db_path)
            .and_then(|store| store.insert(&draft))
            .unwrap_or_else(|e| {
                log::warn!("[OfflineStore] Failed to queue draft {}: {}", draft.id, e);
                false
            })
    }

    /// Drafts still waiting to be sent, oldest first.
    #[cfg(feature = "offline")]
    #[uniffi::export]
    pub fn ffi_pending_drafts(db_path: String) -> Vec<OfflineDraft> {
        init_logging();
        OfflineStore::open(&db_path)
            .and_then(|store| store.pending())
            .unwrap_or_else(|e| {
                log::warn!("[OfflineStore] Failed to list pending drafts: {}", e);
                vec![]
            })
    }

    #[cfg(feature = "offline")]
    #[uniffi::export]
    pub fn ffi_mark_synced(db_path: String, id: String) -> bool {
        init_logging();
        OfflineStore::open(&db_path)
            .and_then(|store| store.mark_synced(&id))
            .unwrap_or_else(|e| {
                log::warn!("[OfflineStore] Failed to mark {} synced: {}", id, e);
                false
            })
    }

    #[cfg(feature = "offline")]
    #[uniffi::export]
    pub fn ffi_remove_draft(db_path: String, id: String) -> bool {
        init_logging();
        OfflineStore::open(&db_path)
            .and_then(|store| store.remove(&id))
            .unwrap_or_else(|e| {
                log::warn!("[OfflineStore] Failed to remove {}: {}", id, e);
                false
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
