//! Fetch occurrences from a running backend and print clustered markers.
//!
//! Run with: cargo run --example fetch_clusters --features http -- <base_url> [token]

use occurrence_map::http::fetch_cluster_markers_blocking;
use occurrence_map::{ClientConfig, ClusterConfig, OccurrenceFilter};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    let base_url = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| ClientConfig::default().base_url);

    let config = ClientConfig {
        base_url,
        bearer_token: args.get(2).cloned(),
        ..ClientConfig::default()
    };

    match fetch_cluster_markers_blocking(config, OccurrenceFilter::default(), ClusterConfig::default()) {
        Ok(markers) => {
            println!("{} markers", markers.len());
            for marker in markers {
                println!(
                    "  ({:.5}, {:.5}) x{} {:?}",
                    marker.latitude,
                    marker.longitude,
                    marker.count,
                    marker.items.iter().map(|o| o.id.as_str()).collect::<Vec<_>>()
                );
            }
        }
        Err(e) => {
            eprintln!("Failed to fetch clusters: {}", e);
            std::process::exit(1);
        }
    }
}
