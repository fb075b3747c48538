//! Cluster-to-marker projection.
//!
//! A marker sits at its cluster's anchor. Single-member clusters render as a plain
//! pin, larger ones as a badge showing the count. Tapping a marker hands `items`
//! back to the caller.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cluster::OccurrenceCluster;
use crate::geo_utils::{compute_bounds, Bounds};
use crate::{GeoPoint, Occurrence, OccurrenceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MarkerKind {
    /// Plain pin for a single occurrence
    Single,
    /// Pin with a count badge
    Badge,
}

/// A renderable map marker, serialized as `{lat, lon, count, kind, items}`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapMarker {
    #[cfg_attr(feature = "serde", serde(rename = "lat"))]
    pub latitude: f64,
    #[cfg_attr(feature = "serde", serde(rename = "lon"))]
    pub longitude: f64,
    pub count: u32,
    pub kind: MarkerKind,
    pub items: Vec<Occurrence>,
}

impl MapMarker {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

impl From<&OccurrenceCluster> for MapMarker {
    fn from(cluster: &OccurrenceCluster) -> Self {
        Self {
            latitude: cluster.anchor.latitude,
            longitude: cluster.anchor.longitude,
            count: cluster.count,
            kind: if cluster.count > 1 { MarkerKind::Badge } else { MarkerKind::Single },
            items: cluster.members.clone(),
        }
    }
}

/// Project clusters to markers, keeping cluster order.
pub fn to_markers(clusters: &[OccurrenceCluster]) -> Vec<MapMarker> {
    clusters.iter().map(MapMarker::from).collect()
}

/// Marker for showing one occurrence on its own (e.g. "view on map" from a list).
pub fn single_marker(occurrence: &Occurrence) -> MapMarker {
    MapMarker {
        latitude: occurrence.latitude,
        longitude: occurrence.longitude,
        count: 1,
        kind: MarkerKind::Single,
        items: vec![occurrence.clone()],
    }
}

/// Distinct member statuses in first-seen order, for tinting a cluster marker.
///
/// ```
/// use occurrence_map::{cluster_occurrences, status_set, Occurrence, OccurrenceStatus};
///
/// let occurrences = vec![
///     Occurrence::new("a", -15.5369, -47.3316, OccurrenceStatus::Closed),
///     Occurrence::new("b", -15.5369, -47.3316, OccurrenceStatus::Open),
///     Occurrence::new("c", -15.5369, -47.3316, OccurrenceStatus::Closed),
/// ];
/// let clusters = cluster_occurrences(&occurrences, 200.0);
/// assert_eq!(
///     status_set(&clusters[0]),
///     vec![OccurrenceStatus::Closed, OccurrenceStatus::Open],
/// );
/// ```
pub fn status_set(cluster: &OccurrenceCluster) -> Vec<OccurrenceStatus> {
    let mut statuses: Vec<OccurrenceStatus> = Vec::new();
    for member in &cluster.members {
        if !statuses.contains(&member.status) {
            statuses.push(member.status);
        }
    }
    statuses
}

/// Bounds enclosing all markers, for fitting the map viewport.
pub fn marker_bounds(markers: &[MapMarker]) -> Option<Bounds> {
    let positions: Vec<GeoPoint> = markers.iter().map(MapMarker::position).collect();
    compute_bounds(&positions)
}
