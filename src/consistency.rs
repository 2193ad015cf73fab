use chrono::Duration;
use log::warn;

use crate::collector::CollectedSet;
use crate::errors::ConsistencyError;

/// Gates reassembly on the collected set looking like one coherent
/// distribution event: the full expected count, with every submission time
/// within `tolerance` of the median. Fails closed on the first shortfall or
/// the worst outlier; a late or early fragment may be stale, replayed, or
/// substituted data.
pub fn validate(
    collected: &CollectedSet,
    expected: usize,
    tolerance: Duration,
) -> Result<(), ConsistencyError> {
    if collected.len() < expected {
        return Err(ConsistencyError::InsufficientFragments {
            expected,
            collected: collected.len(),
        });
    }
    if collected.is_empty() {
        return Ok(());
    }

    let median = median_millis(collected);
    let mut worst: Option<ConsistencyError> = None;
    let mut worst_deviation = tolerance.num_milliseconds();

    for fragment in collected.values() {
        let deviation = (fragment.stored_at.timestamp_millis() - median).abs();
        if deviation > tolerance.num_milliseconds() {
            warn!(
                "outlier: {} submitted {} ms off the median",
                fragment.worker, deviation
            );
        }
        if deviation > worst_deviation {
            worst_deviation = deviation;
            worst = Some(ConsistencyError::Outlier {
                worker: fragment.worker.clone(),
                deviation_ms: deviation,
            });
        }
    }

    match worst {
        Some(outlier) => Err(outlier),
        None => Ok(()),
    }
}

fn median_millis(collected: &CollectedSet) -> i64 {
    let mut millis: Vec<i64> = collected
        .values()
        .map(|f| f.stored_at.timestamp_millis())
        .collect();
    millis.sort_unstable();
    let mid = millis.len() / 2;
    if millis.len() % 2 == 1 {
        millis[mid]
    } else {
        (millis[mid - 1] + millis[mid]) / 2
    }
}
