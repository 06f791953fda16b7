// Retrieval orchestration - bounded-concurrency partitioned fetch
use crate::application::aligner;
use crate::application::archive_repository::{ArchiveBackend, ProgressSink, SignalCatalog};
use crate::domain::descriptor::SignalDescriptor;
use crate::domain::partition::{self, DAY_US};
use crate::domain::sample::Sample;
use crate::domain::series::Series;
use crate::error::{ArchiveError, BackendError};
use chrono::NaiveDateTime;
use futures::future::join_all;
use std::sync::Arc;

/// Default cap on in-flight partition queries.
const MAX_CONCURRENT_QUERIES: usize = 6;

/// Default extra-point lookback, in seconds.
const EXTRA_POINT_LOOKUP_SECS: i64 = 3600;

const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Post-processing applied after a multi-attribute retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Series returned as archived, failed samples included.
    Normal,
    /// Failed samples removed.
    IgnoreErrors,
    /// Failed samples removed, then all series truncated onto the timeline
    /// of the shortest one.
    Correlated,
    /// Failed samples removed, then all series extended onto the union
    /// timeline.
    Filled,
}

/// Fetches series from the partitioned archive through the backend and
/// catalog collaborators.
pub struct RetrievalService {
    backend: Arc<dyn ArchiveBackend>,
    catalog: Arc<dyn SignalCatalog>,
    max_concurrency: usize,
    granularity_us: i64,
    extra_point_enabled: bool,
    extra_point_lookup_secs: i64,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl RetrievalService {
    pub fn new(backend: Arc<dyn ArchiveBackend>, catalog: Arc<dyn SignalCatalog>) -> Self {
        Self {
            backend,
            catalog,
            max_concurrency: MAX_CONCURRENT_QUERIES,
            granularity_us: DAY_US,
            extra_point_enabled: false,
            extra_point_lookup_secs: EXTRA_POINT_LOOKUP_SECS,
            progress: None,
        }
    }

    /// Cap on in-flight partition queries. A hard resource bound against the
    /// backend, clamped to at least 1.
    pub fn set_max_concurrency(&mut self, n: usize) {
        self.max_concurrency = n.max(1);
    }

    pub fn set_granularity(&mut self, granularity_us: i64) {
        self.granularity_us = granularity_us;
    }

    pub fn enable_extra_point(&mut self, enabled: bool) {
        self.extra_point_enabled = enabled;
    }

    pub fn set_extra_point_lookup_period(&mut self, secs: i64) {
        self.extra_point_lookup_secs = secs;
    }

    pub fn set_progress_sink(&mut self, sink: Arc<dyn ProgressSink>) {
        self.progress = Some(sink);
    }

    pub fn catalog(&self) -> &Arc<dyn SignalCatalog> {
        &self.catalog
    }

    /// Fetch one attribute over `[start, end)`. Dates are
    /// `dd/mm/yyyy HH:mm:ss`; `end` must be strictly after `start`.
    pub async fn get_series(
        &self,
        name: &str,
        start: &str,
        end: &str,
    ) -> Result<Series, ArchiveError> {
        let descriptor = self.catalog.resolve(name).await?;
        self.get_series_for(&descriptor, start, end).await
    }

    /// Same as [`get_series`](Self::get_series) for an already-resolved
    /// descriptor.
    pub async fn get_series_for(
        &self,
        descriptor: &SignalDescriptor,
        start: &str,
        end: &str,
    ) -> Result<Series, ArchiveError> {
        let (start_us, end_us) = parse_interval(start, end)?;
        self.fetch_one(descriptor, start_us, end_us, 1, 1).await
    }

    /// Fetch several attributes over the same interval, sequentially, then
    /// apply the extract mode. Progress is reported per attribute at
    /// `index/total`.
    pub async fn get_series_set(
        &self,
        names: &[&str],
        start: &str,
        end: &str,
        mode: ExtractMode,
    ) -> Result<Vec<Series>, ArchiveError> {
        let (start_us, end_us) = parse_interval(start, end)?;

        let mut descriptors = Vec::with_capacity(names.len());
        for name in names {
            descriptors.push(self.catalog.resolve(name).await?);
        }

        let total = descriptors.len();
        let mut result = Vec::with_capacity(total);
        for (i, descriptor) in descriptors.iter().enumerate() {
            result.push(
                self.fetch_one(descriptor, start_us, end_us, i + 1, total)
                    .await?,
            );
        }

        if mode != ExtractMode::Normal {
            for series in &mut result {
                series.remove_failed();
            }
        }
        match mode {
            ExtractMode::Correlated => aligner::correlate(result),
            ExtractMode::Filled => aligner::fill(result),
            _ => Ok(result),
        }
    }

    /// One attribute fetch with the extra-point fallback: an empty result
    /// triggers a lookback fetch over `[start - lookup, start)` whose last
    /// sample, if any, is the carried-forward value valid at `start`.
    async fn fetch_one(
        &self,
        descriptor: &SignalDescriptor,
        start_us: i64,
        end_us: i64,
        index: usize,
        total: usize,
    ) -> Result<Series, ArchiveError> {
        let series = self
            .fetch_interval(descriptor, start_us, end_us, index, total)
            .await?;

        if !series.is_empty() || !self.extra_point_enabled {
            return Ok(series);
        }

        let lookback_start = start_us - self.extra_point_lookup_secs * 1_000_000;
        tracing::debug!(
            attribute = %descriptor.name,
            "empty result, looking back {}s for an extra point",
            self.extra_point_lookup_secs
        );
        let lookback = self
            .fetch_interval(descriptor, lookback_start, start_us, index, total)
            .await?;

        let mut result = Series::new(descriptor.clone());
        if let Some(last) = lookback.last() {
            result.push(last.clone());
        }
        Ok(result)
    }

    /// Core fetch loop: plan partitions, process them in batches of at most
    /// `max_concurrency` windows, decode rows in window order so the series
    /// stays time-sorted without re-sorting.
    async fn fetch_interval(
        &self,
        descriptor: &SignalDescriptor,
        start_us: i64,
        end_us: i64,
        index: usize,
        total: usize,
    ) -> Result<Series, ArchiveError> {
        let windows = partition::plan(start_us, end_us, self.granularity_us)?;
        let window_count = windows.len();
        tracing::debug!(
            attribute = %descriptor.name,
            windows = window_count,
            "fetching interval [{start_us}, {end_us})"
        );

        let mut series = Series::new(descriptor.clone());
        let mut last_recoverable: Option<String> = None;
        let mut processed = 0usize;

        for batch in windows.chunks(self.max_concurrency.max(1)) {
            let launches = batch
                .iter()
                .map(|window| self.backend.execute_window(descriptor, window));
            // join_all keeps launch order, so results land back in their
            // original window slot regardless of completion order.
            let results = join_all(launches).await;

            // An unrecoverable failure aborts the fetch; sibling queries in
            // the batch have already finished and their results are dropped.
            if let Some(Err(err)) = results
                .iter()
                .find(|r| r.as_ref().is_err_and(|e| !e.recoverable))
            {
                tracing::error!(
                    attribute = %descriptor.name,
                    "aborting fetch: {}",
                    err.message
                );
                return Err(err.clone().into());
            }

            for (window, result) in batch.iter().zip(results) {
                match result {
                    Ok(rows) => {
                        for row in &rows {
                            series.push(Sample::decode(descriptor, row)?);
                        }
                    }
                    Err(err) => {
                        // Recoverable: this window contributes no samples.
                        tracing::warn!(
                            attribute = %descriptor.name,
                            partition = %window.partition_key,
                            "partition query failed: {}",
                            err.message
                        );
                        last_recoverable = Some(err.message);
                    }
                }
            }

            processed += batch.len();
            if let Some(sink) = &self.progress {
                sink.on_progress(processed as f64 / window_count as f64, index, total);
            }
        }

        if series.is_empty() {
            if let Some(message) = last_recoverable {
                return Err(BackendError::recoverable(message).into());
            }
        }

        Ok(series)
    }
}

fn parse_date(s: &str) -> Result<i64, ArchiveError> {
    NaiveDateTime::parse_from_str(s, DATE_FORMAT)
        .map(|dt| dt.and_utc().timestamp_micros())
        .map_err(|e| ArchiveError::InvalidRange(format!("wrong date format {s:?}: {e}")))
}

fn parse_interval(start: &str, end: &str) -> Result<(i64, i64), ArchiveError> {
    let start_us = parse_date(start)?;
    let end_us = parse_date(end)?;
    if end_us <= start_us {
        return Err(ArchiveError::InvalidRange(format!(
            "start ({start}) must be before end ({end})"
        )));
    }
    Ok((start_us, end_us))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::{Access, ScalarKind, Shape};
    use crate::domain::partition::PartitionWindow;
    use crate::domain::sample::RawRow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Backend serving evenly spaced synthetic rows, with per-partition
    /// failure injection keyed by partition date.
    struct MockBackend {
        rows_per_window: usize,
        data_range: Option<(i64, i64)>,
        recoverable_failures: Vec<String>,
        unrecoverable_failures: Vec<String>,
    }

    impl MockBackend {
        fn new(rows_per_window: usize) -> Self {
            Self {
                rows_per_window,
                data_range: None,
                recoverable_failures: Vec::new(),
                unrecoverable_failures: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ArchiveBackend for MockBackend {
        async fn execute_window(
            &self,
            _descriptor: &SignalDescriptor,
            window: &PartitionWindow,
        ) -> Result<Vec<RawRow>, BackendError> {
            if self.unrecoverable_failures.contains(&window.partition_key) {
                return Err(BackendError::unrecoverable("no reachable endpoint"));
            }
            if self.recoverable_failures.contains(&window.partition_key) {
                return Err(BackendError::recoverable("tombstoned partition"));
            }
            let step = (window.end - window.start) / self.rows_per_window as i64;
            let rows = (0..self.rows_per_window)
                .map(|i| window.start + i as i64 * step)
                .filter(|t| match self.data_range {
                    Some((lo, hi)) => *t >= lo && *t < hi,
                    None => true,
                })
                .map(|t| RawRow {
                    data_time: t,
                    recv_time: t,
                    insert_time: t,
                    quality: 0,
                    error: None,
                    value: json!(t as f64),
                    write_value: serde_json::Value::Null,
                })
                .collect();
            Ok(rows)
        }
    }

    struct MockCatalog;

    #[async_trait]
    impl SignalCatalog for MockCatalog {
        async fn resolve(&self, name: &str) -> Result<SignalDescriptor, ArchiveError> {
            crate::domain::descriptor::SignalName::parse(name)?;
            Ok(SignalDescriptor::new(
                format!("id-{name}"),
                name,
                ScalarKind::Double,
                Shape::Scalar,
                Access::ReadOnly,
            ))
        }

        async fn attributes(&self) -> Result<Vec<String>, ArchiveError> {
            Ok(vec![])
        }

        async fn hosts(&self) -> Result<Vec<String>, ArchiveError> {
            Ok(vec![])
        }

        async fn domains(&self, _host: &str) -> Result<Vec<String>, ArchiveError> {
            Ok(vec![])
        }

        async fn families(&self, _h: &str, _d: &str) -> Result<Vec<String>, ArchiveError> {
            Ok(vec![])
        }

        async fn members(
            &self,
            _h: &str,
            _d: &str,
            _f: &str,
        ) -> Result<Vec<String>, ArchiveError> {
            Ok(vec![])
        }

        async fn names(
            &self,
            _h: &str,
            _d: &str,
            _f: &str,
            _m: &str,
        ) -> Result<Vec<String>, ArchiveError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct ProgressRecorder {
        calls: Mutex<Vec<(f64, usize, usize)>>,
    }

    impl ProgressSink for ProgressRecorder {
        fn on_progress(&self, fraction: f64, index: usize, total: usize) {
            self.calls.lock().unwrap().push((fraction, index, total));
        }
    }

    const ATT: &str = "srv:10000/sys/machine/ring/current";
    // 01/01/2020 12:00:00 UTC in microseconds.
    const START: &str = "01/01/2020 12:00:00";
    const END: &str = "03/01/2020 12:00:00";

    fn service(backend: MockBackend) -> RetrievalService {
        RetrievalService::new(Arc::new(backend), Arc::new(MockCatalog))
    }

    fn assert_monotonic(series: &Series) {
        let times = series.data_times();
        assert!(times.windows(2).all(|p| p[0] <= p[1]));
    }

    #[tokio::test]
    async fn test_three_partition_fetch_with_progress() {
        let mut svc = service(MockBackend::new(10));
        svc.set_max_concurrency(2);
        let progress = Arc::new(ProgressRecorder::default());
        svc.set_progress_sink(progress.clone());

        // Two midday endpoints two days apart span three calendar-day
        // partitions.
        let series = svc.get_series(ATT, START, END).await.unwrap();
        assert_eq!(series.len(), 30);
        assert_monotonic(&series);

        let calls = progress.calls.lock().unwrap();
        // 3 windows at concurrency 2 -> exactly 2 batches.
        assert_eq!(calls.len(), 2);
        assert!(calls[0].0 < calls[1].0);
        assert_eq!(calls[1].0, 1.0);
        assert!(calls.iter().all(|(_, i, t)| *i == 1 && *t == 1));
    }

    #[tokio::test]
    async fn test_output_independent_of_concurrency() {
        let mut svc1 = service(MockBackend::new(10));
        svc1.set_max_concurrency(1);
        let mut svc6 = service(MockBackend::new(10));
        svc6.set_max_concurrency(6);

        let a = svc1.get_series(ATT, START, END).await.unwrap();
        let b = svc6.get_series(ATT, START, END).await.unwrap();
        assert_eq!(a, b);
        assert_monotonic(&a);
    }

    #[tokio::test]
    async fn test_recoverable_failure_skips_partition() {
        let mut backend = MockBackend::new(10);
        backend.recoverable_failures.push("2020-01-02".to_string());
        let svc = service(backend);

        let series = svc.get_series(ATT, START, END).await.unwrap();
        // The middle partition contributes nothing; the fetch still succeeds.
        assert_eq!(series.len(), 20);
        assert_monotonic(&series);
    }

    #[tokio::test]
    async fn test_unrecoverable_failure_aborts() {
        let mut backend = MockBackend::new(10);
        backend.unrecoverable_failures.push("2020-01-02".to_string());
        let svc = service(backend);

        let err = svc.get_series(ATT, START, END).await.unwrap_err();
        match err {
            ArchiveError::Backend(b) => assert!(!b.recoverable),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_recoverable_and_empty_is_an_error() {
        let mut backend = MockBackend::new(10);
        for key in ["2020-01-01", "2020-01-02", "2020-01-03"] {
            backend.recoverable_failures.push(key.to_string());
        }
        let svc = service(backend);

        let err = svc.get_series(ATT, START, END).await.unwrap_err();
        match err {
            ArchiveError::Backend(b) => {
                assert!(b.recoverable);
                assert_eq!(b.message, "tombstoned partition");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_genuinely_empty_result_is_not_an_error() {
        let mut backend = MockBackend::new(10);
        backend.data_range = Some((0, 1));
        let svc = service(backend);

        let series = svc.get_series(ATT, START, END).await.unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_extra_point_lookback() {
        let mut backend = MockBackend::new(10);
        // Data exists only before the requested interval.
        let request_start = parse_date(START).unwrap();
        backend.data_range = Some((0, request_start));
        let mut svc = service(backend);

        let series = svc.get_series(ATT, START, END).await.unwrap();
        assert!(series.is_empty());

        svc.enable_extra_point(true);
        let series = svc.get_series(ATT, START, END).await.unwrap();
        assert_eq!(series.len(), 1);
        // The carried-forward point is the last sample at or before start.
        assert!(series.first().unwrap().data_time < request_start);
    }

    #[tokio::test]
    async fn test_invalid_interval_is_rejected() {
        let svc = service(MockBackend::new(10));
        assert!(matches!(
            svc.get_series(ATT, END, START).await,
            Err(ArchiveError::InvalidRange(_))
        ));
        assert!(matches!(
            svc.get_series(ATT, START, START).await,
            Err(ArchiveError::InvalidRange(_))
        ));
        assert!(matches!(
            svc.get_series(ATT, "2020-01-01T00:00:00", END).await,
            Err(ArchiveError::InvalidRange(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_attribute_is_not_found() {
        let svc = service(MockBackend::new(10));
        assert!(matches!(
            svc.get_series("not-a-qualified-name", START, END).await,
            Err(ArchiveError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_multi_attribute_fill_and_progress() {
        let mut svc = service(MockBackend::new(5));
        let progress = Arc::new(ProgressRecorder::default());
        svc.set_progress_sink(progress.clone());

        let other = "srv:10000/sys/machine/ring/lifetime";
        let out = svc
            .get_series_set(&[ATT, other], START, END, ExtractMode::Filled)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), out[1].len());
        assert_eq!(out[0].data_times(), out[1].data_times());

        let calls = progress.calls.lock().unwrap();
        assert!(calls.iter().any(|(_, i, t)| *i == 1 && *t == 2));
        assert!(calls.iter().any(|(_, i, t)| *i == 2 && *t == 2));
    }

    #[tokio::test]
    async fn test_multi_attribute_correlate() {
        let svc = service(MockBackend::new(5));
        let other = "srv:10000/sys/machine/ring/lifetime";
        let out = svc
            .get_series_set(&[ATT, other], START, END, ExtractMode::Correlated)
            .await
            .unwrap();
        assert_eq!(out[0].len(), out[1].len());
        assert_eq!(out[0].data_times(), out[1].data_times());
    }
}
