// Partition planning - split a date range into archive partition windows
use crate::error::ArchiveError;
use chrono::DateTime;

/// Default partition granularity: one calendar day, in microseconds.
pub const DAY_US: i64 = 86_400_000_000;

/// One window of a retrieval plan. Windows are half-open `[start, end)`,
/// contiguous and ascending; `is_full` marks a window spanning a whole
/// partition, which the backend may serve with a cheaper query shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionWindow {
    /// Inclusive start, microseconds since epoch.
    pub start: i64,
    /// Exclusive end, microseconds since epoch.
    pub end: i64,
    /// Physical partition key, the `%Y-%m-%d` rendering of the partition
    /// start for day granularity.
    pub partition_key: String,
    pub is_full: bool,
}

impl PartitionWindow {
    fn new(start: i64, end: i64, partition_start: i64, is_full: bool) -> Self {
        Self {
            start,
            end,
            partition_key: partition_key_for(partition_start),
            is_full,
        }
    }
}

fn partition_key_for(time_us: i64) -> String {
    match DateTime::from_timestamp_micros(time_us) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => time_us.to_string(),
    }
}

/// Split `[start, end)` into partition windows of the given granularity.
///
/// The first window is clipped on the left and never full; interior windows
/// covering a whole partition are full; the final window is clipped on the
/// right and never full, even when the range ends exactly on a partition
/// boundary. A range inside one partition yields a single clipped window.
pub fn plan(
    start_us: i64,
    end_us: i64,
    granularity_us: i64,
) -> Result<Vec<PartitionWindow>, ArchiveError> {
    if granularity_us <= 0 {
        return Err(ArchiveError::InvalidRange(format!(
            "granularity must be positive, got {granularity_us}"
        )));
    }
    if end_us <= start_us {
        return Err(ArchiveError::InvalidRange(format!(
            "end ({}) must be after start ({})",
            end_us, start_us
        )));
    }

    let mut windows = Vec::new();
    let first_partition_start = start_us.div_euclid(granularity_us) * granularity_us;
    let mut cursor = first_partition_start + granularity_us;

    if end_us <= cursor {
        windows.push(PartitionWindow::new(
            start_us,
            end_us,
            first_partition_start,
            false,
        ));
        return Ok(windows);
    }

    windows.push(PartitionWindow::new(
        start_us,
        cursor,
        first_partition_start,
        false,
    ));

    while end_us > cursor + granularity_us {
        windows.push(PartitionWindow::new(
            cursor,
            cursor + granularity_us,
            cursor,
            true,
        ));
        cursor += granularity_us;
    }

    windows.push(PartitionWindow::new(cursor, end_us, cursor, false));
    Ok(windows)
}
