//! Names and descriptions of the cache metrics.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

pub(crate) const OBJECT_HIT: &str = "wger_cache_object_hit_total";
pub(crate) const OBJECT_MISS: &str = "wger_cache_object_miss_total";
pub(crate) const FRAGMENT_HIT: &str = "wger_cache_fragment_hit_total";
pub(crate) const FRAGMENT_MISS: &str = "wger_cache_fragment_miss_total";
pub(crate) const FRAGMENT_EVICT: &str = "wger_cache_fragment_evict_total";
pub(crate) const EVENT_QUEUE_LEN: &str = "wger_cache_event_queue_len";
pub(crate) const CONSUME_MS: &str = "wger_cache_consume_ms";

const COUNTERS: [(&str, &str); 5] = [
    (OBJECT_HIT, "Object cache hits, labelled by kind."),
    (OBJECT_MISS, "Object cache misses, labelled by kind."),
    (FRAGMENT_HIT, "Fragment cache hits, labelled by fragment name."),
    (FRAGMENT_MISS, "Fragment cache misses, labelled by fragment name."),
    (FRAGMENT_EVICT, "Fragments pushed out by the capacity limit."),
];

static DESCRIBED: Once = Once::new();

/// Register descriptions with the installed recorder. Runs once per process.
pub fn describe_metrics() {
    DESCRIBED.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(name, Unit::Count, description);
        }
        describe_gauge!(EVENT_QUEUE_LEN, Unit::Count, "Cache events waiting to be consumed.");
        describe_histogram!(
            CONSUME_MS,
            Unit::Milliseconds,
            "Time spent draining and applying one batch of cache events."
        );
    });
}
