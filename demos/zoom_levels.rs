//! Cluster a synthetic grid of occurrences at several zoom-level radii.
//!
//! Run with: cargo run --example zoom_levels --features parallel

use occurrence_map::{cluster_zoom_levels, Occurrence, OccurrenceStatus};
use std::time::Instant;

fn main() {
    // 40x40 grid roughly 50m apart
    let occurrences: Vec<Occurrence> = (0..1600)
        .map(|i| {
            let row = (i / 40) as f64;
            let col = (i % 40) as f64;
            Occurrence::new(
                &format!("occ-{}", i),
                -15.79 + row * 0.00045,
                -47.88 + col * 0.00045,
                OccurrenceStatus::Open,
            )
        })
        .collect();

    let radii = [50.0, 100.0, 200.0, 500.0, 1_000.0, 2_000.0];

    let start = Instant::now();
    let levels = cluster_zoom_levels(&occurrences, &radii);
    let elapsed = start.elapsed();

    println!("Clustered {} occurrences at {} radii in {:?}\n", occurrences.len(), radii.len(), elapsed);
    for level in &levels {
        let largest = level.clusters.iter().map(|c| c.count).max().unwrap_or(0);
        println!(
            "  {:>6.0}m: {:>5} clusters (largest {})",
            level.radius_meters,
            level.clusters.len(),
            largest
        );
    }
}
