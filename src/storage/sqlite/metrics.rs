//! Shared metrics recording for storage backends.

use std::time::Instant;

/// Records operation metrics for a storage operation.
///
/// Emits `storage_operations_total` (counter) and
/// `storage_operation_duration_ms` (histogram), labelled by backend,
/// operation and status.
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Returns the status label for a result.
pub const fn status_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        let start = Instant::now();
        record_operation_metrics("structured", "probe", start, "success");
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label::<(), ()>(&Ok(())), "success");
        assert_eq!(status_label::<(), ()>(&Err(())), "error");
    }
}
