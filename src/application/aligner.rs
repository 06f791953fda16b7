// Series alignment - correlate and fill over already-retrieved series
use crate::domain::sample::Sample;
use crate::domain::series::Series;
use crate::error::ArchiveError;

/// Rebuild `series` over `timeline`, carrying the nearest at-or-before sample
/// forward and stamping it with the timeline's time. Deep copies throughout.
fn rebuild_over(series: &Series, timeline: &[i64]) -> Result<Series, ArchiveError> {
    let mut samples: Vec<Sample> = Vec::with_capacity(timeline.len());
    for t in timeline {
        let mut s = series
            .before(*t)
            .ok_or_else(|| {
                ArchiveError::EmptySeries(format!(
                    "no sample to carry forward in {}",
                    series.descriptor.name
                ))
            })?
            .clone();
        s.data_time = *t;
        samples.push(s);
    }
    Ok(Series::with_samples(series.descriptor.clone(), samples))
}

fn ensure_non_empty(series: &[Series], operation: &str) -> Result<(), ArchiveError> {
    for s in series {
        if s.is_empty() {
            return Err(ArchiveError::EmptySeries(format!(
                "{operation} requires non-empty input, {} has no samples",
                s.descriptor.name
            )));
        }
    }
    Ok(())
}

/// Align every series onto the timeline of the shortest one.
///
/// The shortest series is the reference. Its leading samples are dropped
/// while every other series starts strictly after its head, so that each
/// remaining reference timestamp has a definable at-or-before value
/// everywhere. Trimming happens on the left edge only; a sibling ending
/// before the reference still answers with its last sample on the right
/// edge. All outputs share the reference's length and timestamps.
pub fn correlate(mut series: Vec<Series>) -> Result<Vec<Series>, ArchiveError> {
    if series.len() < 2 {
        return Ok(series);
    }
    ensure_non_empty(&series, "correlate")?;

    let min_idx = series
        .iter()
        .enumerate()
        .min_by_key(|(_, s)| s.len())
        .map(|(i, _)| i)
        .unwrap_or(0);

    loop {
        let Some(head) = series[min_idx].first() else {
            return Err(ArchiveError::EmptySeries(
                "correlate produced no common point".to_string(),
            ));
        };
        let t0 = head.data_time;
        let all_start_after = series
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != min_idx)
            .all(|(_, s)| t0 < s.first().map(|f| f.data_time).unwrap_or(i64::MIN));
        if all_start_after {
            series[min_idx].remove_first();
        } else {
            break;
        }
    }

    let timeline = series[min_idx].data_times();
    for i in 0..series.len() {
        if i != min_idx {
            series[i] = rebuild_over(&series[i], &timeline)?;
        }
    }

    Ok(series)
}

/// Extend every series onto the sorted union of all timestamps.
pub fn fill(mut series: Vec<Series>) -> Result<Vec<Series>, ArchiveError> {
    if series.len() < 2 {
        return Ok(series);
    }
    ensure_non_empty(&series, "fill")?;

    let mut timeline: Vec<i64> = series.iter().flat_map(Series::data_times).collect();
    timeline.sort_unstable();
    timeline.dedup();

    for s in &mut series {
        *s = rebuild_over(s, &timeline)?;
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::{Access, ScalarKind, Shape, SignalDescriptor};
    use crate::domain::sample::Quality;
    use crate::domain::value::Value;

    fn descriptor(name: &str) -> SignalDescriptor {
        SignalDescriptor::new(
            format!("id-{name}"),
            format!("srv:10000/sys/m/r/{name}"),
            ScalarKind::Double,
            Shape::Scalar,
            Access::ReadOnly,
        )
    }

    fn sample_at(time_us: i64, value: f64) -> Sample {
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

    fn series_of(name: &str, points: &[(i64, f64)]) -> Series {
        Series::with_samples(
            descriptor(name),
            points.iter().map(|(t, v)| sample_at(*t, *v)).collect(),
        )
    }

    #[test]
    fn test_fill_worked_example() {
        let a = series_of("a", &[(1, 10.0), (3, 30.0), (5, 50.0)]);
        let b = series_of("b", &[(2, 20.0), (4, 40.0)]);

        let out = fill(vec![a, b]).unwrap();
        assert_eq!(out[0].data_times(), vec![1, 2, 3, 4, 5]);
        assert_eq!(out[1].data_times(), vec![1, 2, 3, 4, 5]);
        assert_eq!(
            out[0].values_as_f64().unwrap(),
            vec![10.0, 10.0, 30.0, 30.0, 50.0]
        );
        assert_eq!(
            out[1].values_as_f64().unwrap(),
            vec![20.0, 20.0, 20.0, 40.0, 40.0]
        );
    }

    #[test]
    fn test_fill_timeline_is_union() {
        let a = series_of("a", &[(1, 1.0), (3, 3.0)]);
        let b = series_of("b", &[(3, 30.0), (7, 70.0)]);
        let out = fill(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(out[0].data_times(), vec![1, 3, 7]);
        assert_eq!(out[0].len(), out[1].len());
        assert!(out[0].len() >= a.len().max(b.len()));
    }

    #[test]
    fn test_fill_rejects_empty_input() {
        let a = series_of("a", &[(1, 1.0)]);
        let b = Series::new(descriptor("b"));
        assert!(matches!(
            fill(vec![a, b]),
            Err(ArchiveError::EmptySeries(_))
        ));
    }

    #[test]
    fn test_correlate_trims_left_edge_of_reference() {
        // Reference (shorter) starts before both others; its leading samples
        // must be dropped until a sibling starts at or before its head.
        let a = series_of("a", &[(1, 1.0), (5, 5.0), (9, 9.0)]);
        let b = series_of("b", &[(4, 40.0), (6, 60.0), (8, 80.0), (10, 100.0)]);

        let out = correlate(vec![a, b]).unwrap();
        // t=1 dropped from the reference (b starts at 4), t=5 kept.
        assert_eq!(out[0].data_times(), vec![5, 9]);
        assert_eq!(out[1].data_times(), vec![5, 9]);
        assert_eq!(out[1].values_as_f64().unwrap(), vec![40.0, 80.0]);
    }

    #[test]
    fn test_correlate_outputs_share_reference_timeline() {
        let a = series_of("a", &[(2, 1.0), (4, 2.0)]);
        let b = series_of("b", &[(1, 10.0), (3, 20.0), (5, 30.0)]);
        let out = correlate(vec![a.clone(), b]).unwrap();
        assert_eq!(out[0].len(), out[1].len());
        assert_eq!(out[0].data_times(), out[1].data_times());
        // Output timestamps are a subsequence of the shorter input's.
        let input_times = a.data_times();
        assert!(out[0].data_times().iter().all(|t| input_times.contains(t)));
        // b's carried values are the at-or-before ones.
        assert_eq!(out[1].values_as_f64().unwrap(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_correlate_copies_do_not_alias() {
        let a = series_of("a", &[(2, 1.0), (4, 2.0)]);
        let b = series_of("b", &[(3, 10.0)]);
        // b is the reference here; a gets rebuilt from copies.
        let out = correlate(vec![a.clone(), b]).unwrap();
        assert_eq!(out[0].data_times(), vec![3]);
        assert_eq!(out[0].values_as_f64().unwrap(), vec![1.0]);
        // The input series is untouched.
        assert_eq!(a.data_times(), vec![2, 4]);
    }

    #[test]
    fn test_correlate_fails_when_no_common_point() {
        // Reference entirely before the sibling: every head gets trimmed.
        let a = series_of("a", &[(1, 1.0), (2, 2.0)]);
        let b = series_of("b", &[(10, 10.0), (11, 11.0), (12, 12.0)]);
        assert!(matches!(
            correlate(vec![a, b]),
            Err(ArchiveError::EmptySeries(_))
        ));
    }

    #[test]
    fn test_correlate_rejects_empty_input() {
        let a = series_of("a", &[(1, 1.0)]);
        let b = Series::new(descriptor("b"));
        assert!(matches!(
            correlate(vec![a, b]),
            Err(ArchiveError::EmptySeries(_))
        ));
    }

    #[test]
    fn test_single_series_passes_through() {
        let a = series_of("a", &[(1, 1.0)]);
        let out = fill(vec![a.clone()]).unwrap();
        assert_eq!(out[0], a);
        let out = correlate(vec![a.clone()]).unwrap();
        assert_eq!(out[0], a);
    }
}
