// Series domain model - one signal's samples over an interval
use crate::domain::descriptor::SignalDescriptor;
use crate::domain::sample::Sample;
use crate::error::ArchiveError;

/// Ordered sequence of samples for one signal. Samples are sorted ascending
/// by `data_time` (ties permitted); the sequence may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub descriptor: SignalDescriptor,
    samples: Vec<Sample>,
}

impl Series {
    pub fn new(descriptor: SignalDescriptor) -> Self {
        Self {
            descriptor,
            samples: Vec::new(),
        }
    }

    pub fn with_samples(descriptor: SignalDescriptor, samples: Vec<Sample>) -> Self {
        Self { descriptor, samples }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Sample> {
        self.samples.get(idx)
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }

    /// Drop the leading sample.
    pub fn remove_first(&mut self) {
        if !self.samples.is_empty() {
            self.samples.remove(0);
        }
    }

    /// Remove every failed sample.
    pub fn remove_failed(&mut self) {
        self.samples.retain(|s| !s.has_failed());
    }

    /// Nearest sample at or before `time_us`. Exact matches win; a time
    /// before the first sample returns the first sample (no backward
    /// extrapolation, a documented approximation). `None` only when empty.
    pub fn before(&self, time_us: i64) -> Option<&Sample> {
        if self.samples.is_empty() {
            return None;
        }
        match self.samples.binary_search_by_key(&time_us, |s| s.data_time) {
            Ok(idx) => self.samples.get(idx),
            Err(0) => self.samples.first(),
            Err(insert) => self.samples.get(insert - 1),
        }
    }

    /// All timestamps, ascending.
    pub fn data_times(&self) -> Vec<i64> {
        self.samples.iter().map(|s| s.data_time).collect()
    }

    /// Apply a numeric conversion factor to every sample.
    pub fn apply_factor(&mut self, f: f64) {
        for s in &mut self.samples {
            s.apply_factor(f);
        }
    }

    /// All read values as doubles, for scalar numeric series. Failed samples
    /// yield `NaN`.
    pub fn values_as_f64(&self) -> Result<Vec<f64>, ArchiveError> {
        self.scalar_numeric_check()?;
        self.samples
            .iter()
            .map(|s| match &s.read_value {
                Some(v) if !s.has_failed() => v.as_f64(),
                _ => Ok(f64::NAN),
            })
            .collect()
    }

    /// All write values as doubles, for scalar numeric series. Failed or
    /// absent write values yield `NaN`.
    pub fn write_values_as_f64(&self) -> Result<Vec<f64>, ArchiveError> {
        self.scalar_numeric_check()?;
        self.samples
            .iter()
            .map(|s| match &s.write_value {
                Some(v) if !s.has_failed() => v.as_f64(),
                _ => Ok(f64::NAN),
            })
            .collect()
    }

    /// All read values as integers, for scalar numeric series. Failed samples
    /// yield `invalid_marker` (integers have no NaN).
    pub fn values_as_i64(&self, invalid_marker: i64) -> Result<Vec<i64>, ArchiveError> {
        self.scalar_numeric_check()?;
        self.samples
            .iter()
            .map(|s| match &s.read_value {
                Some(v) if !s.has_failed() => v.as_i64(),
                _ => Ok(invalid_marker),
            })
            .collect()
    }

    fn scalar_numeric_check(&self) -> Result<(), ArchiveError> {
        if self.descriptor.is_array() {
            return Err(ArchiveError::UnsupportedConversion {
                from: "array series",
                to: "scalar values",
            });
        }
        if !self.descriptor.is_numeric() {
            return Err(ArchiveError::UnsupportedConversion {
                from: "string series",
                to: "numeric values",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::{Access, ScalarKind, Shape};
    use crate::domain::sample::Quality;
    use crate::domain::value::Value;

    pub(crate) fn scalar_double_descriptor(name: &str) -> SignalDescriptor {
        SignalDescriptor::new(
            format!("id-{name}"),
            format!("srv:10000/sys/m/r/{name}"),
            ScalarKind::Double,
            Shape::Scalar,
            Access::ReadOnly,
        )
    }

    pub(crate) fn sample_at(time_us: i64, value: f64) -> Sample {
        Sample {
            data_time: time_us,
            recv_time: time_us,
            insert_time: time_us,
            quality: Quality::Valid,
            error: None,
            read_value: Some(Value::Double(value)),
            write_value: None,
        }
    }

    fn series_of(times_values: &[(i64, f64)]) -> Series {
        Series::with_samples(
            scalar_double_descriptor("a"),
            times_values.iter().map(|(t, v)| sample_at(*t, *v)).collect(),
        )
    }

    #[test]
    fn test_before_exact_match_is_idempotent() {
        let s = series_of(&[(10, 1.0), (20, 2.0), (30, 3.0)]);
        let hit = s.before(20).unwrap();
        assert_eq!(hit.data_time, 20);
        assert_eq!(hit.read_value, Some(Value::Double(2.0)));
    }

    #[test]
    fn test_before_falls_back_to_previous_sample() {
        let s = series_of(&[(10, 1.0), (20, 2.0), (30, 3.0)]);
        assert_eq!(s.before(25).unwrap().data_time, 20);
        assert_eq!(s.before(31).unwrap().data_time, 30);
    }

    #[test]
    fn test_before_first_sample_returns_first() {
        let s = series_of(&[(10, 1.0), (20, 2.0)]);
        assert_eq!(s.before(5).unwrap().data_time, 10);
    }

    #[test]
    fn test_before_empty_is_none() {
        let s = Series::new(scalar_double_descriptor("a"));
        assert!(s.before(100).is_none());
    }

    #[test]
    fn test_remove_failed() {
        let mut s = series_of(&[(10, 1.0), (20, 2.0)]);
        let mut bad = sample_at(15, 0.0);
        bad.error = Some("fault".to_string());
        bad.read_value = None;
        s.push(bad);
        s.remove_failed();
        assert_eq!(s.len(), 2);
        assert!(s.samples().iter().all(|x| !x.has_failed()));
    }

    #[test]
    fn test_values_as_f64_maps_failures_to_nan() {
        let mut s = series_of(&[(10, 1.0)]);
        let mut bad = sample_at(20, 0.0);
        bad.error = Some("fault".to_string());
        bad.read_value = None;
        s.push(bad);
        let values = s.values_as_f64().unwrap();
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert_eq!(s.values_as_i64(i64::MIN).unwrap(), vec![1, i64::MIN]);
    }

    #[test]
    fn test_values_as_f64_rejects_array_series() {
        let d = SignalDescriptor::new(
            "id-arr",
            "srv:10000/sys/m/r/arr",
            ScalarKind::Double,
            Shape::Array,
            Access::ReadOnly,
        );
        let s = Series::new(d);
        assert!(s.values_as_f64().is_err());
    }
}
