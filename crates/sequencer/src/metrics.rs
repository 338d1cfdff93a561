//! Signer metrics. Names are fixed for operational compatibility; the
//! histograms use the standard 5ms..10s latency buckets.

use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};

pub static MUTATIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "kt_signer_mutations",
        "Number of mutations read from the queue."
    )
    .expect("register kt_signer_mutations")
});

pub static MUTATIONS_UNIQUE: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "kt_signer_mutations_unique",
        "Number of distinct map indexes touched per epoch batch."
    )
    .expect("register kt_signer_mutations_unique")
});

pub static MAP_UPDATE_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "kt_signer_map_update_seconds",
        "Time spent writing one revision's leaves to the map.",
        prometheus::DEFAULT_BUCKETS.to_vec()
    )
    .expect("register kt_signer_map_update_seconds")
});

pub static CREATE_EPOCH_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "kt_signer_create_epoch_seconds",
        "End-to-end time to build and anchor one epoch.",
        prometheus::DEFAULT_BUCKETS.to_vec()
    )
    .expect("register kt_signer_create_epoch_seconds")
});
