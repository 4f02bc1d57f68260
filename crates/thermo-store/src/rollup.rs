//! Bucketed rollup evaluation.
//!
//! Buckets are aligned to the Unix epoch and half-open: a reading at `t`
//! belongs to `[floor(t / w) * w, floor(t / w) * w + w)`. Output points are
//! stamped with the bucket start. Empty buckets produce nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::{Reading, RollupRule};

/// Start of the bucket containing `timestamp`.
#[must_use]
pub fn bucket_start(timestamp: DateTime<Utc>, width_secs: i64) -> DateTime<Utc> {
    let width_millis = width_secs * 1_000;
    let millis = timestamp.timestamp_millis();
    let start = millis.div_euclid(width_millis) * width_millis;
    DateTime::from_timestamp_millis(start).unwrap_or(timestamp)
}

/// Reduces every complete bucket in `[from, until)` to one reading.
///
/// `source` must be sorted by timestamp. `until` is expected to be a bucket
/// boundary; points at or after it are left for a later pass.
#[must_use]
pub fn evaluate(
    rule: &RollupRule,
    source: &[Reading],
    from: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
) -> Vec<Reading> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();

    for reading in source {
        if from.is_some_and(|f| reading.timestamp < f) || reading.timestamp >= until {
            continue;
        }
        buckets
            .entry(bucket_start(reading.timestamp, rule.bucket_width_secs))
            .or_default()
            .push(reading.value);
    }

    buckets
        .into_iter()
        .filter_map(|(start, values)| {
            rule.aggregation
                .apply(&values)
                .map(|value| Reading::new(start, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resolution;
    use chrono::TimeDelta;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn rule(target: Resolution) -> RollupRule {
        RollupRule::for_target(target).unwrap()
    }

    #[test]
    fn bucket_start_aligns_to_epoch() {
        assert_eq!(bucket_start(at(1_700_000_059), 60), at(1_700_000_040));
        assert_eq!(bucket_start(at(1_700_000_040), 60), at(1_700_000_040));
        assert_eq!(bucket_start(at(1_700_002_799), 3_600), at(1_699_999_200));
        assert_eq!(bucket_start(at(1_700_000_000), 86_400), at(1_699_920_000));
    }

    #[test]
    fn bucket_start_drops_subsecond_part() {
        let t = at(1_700_000_041) + TimeDelta::milliseconds(750);
        assert_eq!(bucket_start(t, 60), at(1_700_000_040));
    }

    #[test]
    fn two_readings_in_one_bucket_average() {
        let start = at(1_700_000_040);
        let source = [
            Reading::new(start + TimeDelta::seconds(5), 10.0),
            Reading::new(start + TimeDelta::seconds(35), 20.0),
        ];

        let out = evaluate(
            &rule(Resolution::Mean60s),
            &source,
            None,
            start + TimeDelta::seconds(60),
        );

        assert_eq!(out, vec![Reading::new(start, 15.0)]);
    }

    #[test]
    fn empty_bucket_produces_no_point() {
        let start = at(1_700_000_040);
        let source = [
            Reading::new(start, 10.0),
            // nothing in the following minute
            Reading::new(start + TimeDelta::seconds(130), 30.0),
        ];

        let out = evaluate(
            &rule(Resolution::Mean60s),
            &source,
            None,
            start + TimeDelta::seconds(180),
        );

        assert_eq!(
            out,
            vec![
                Reading::new(start, 10.0),
                Reading::new(start + TimeDelta::seconds(120), 30.0),
            ]
        );
    }

    #[test]
    fn incomplete_bucket_is_left_for_later() {
        let start = at(1_700_000_040);
        let source = [
            Reading::new(start + TimeDelta::seconds(10), 10.0),
            Reading::new(start + TimeDelta::seconds(70), 99.0),
        ];

        let out = evaluate(
            &rule(Resolution::Mean60s),
            &source,
            None,
            start + TimeDelta::seconds(60),
        );

        assert_eq!(out, vec![Reading::new(start, 10.0)]);
    }

    #[test]
    fn points_before_watermark_are_skipped() {
        let start = at(1_700_000_040);
        let source = [
            Reading::new(start + TimeDelta::seconds(10), 10.0),
            Reading::new(start + TimeDelta::seconds(70), 20.0),
        ];

        let out = evaluate(
            &rule(Resolution::Mean60s),
            &source,
            Some(start + TimeDelta::seconds(60)),
            start + TimeDelta::seconds(120),
        );

        assert_eq!(out, vec![Reading::new(start + TimeDelta::seconds(60), 20.0)]);
    }

    #[test]
    fn hourly_rule_averages_minute_means() {
        let hour = at(1_699_999_200);
        let source: Vec<Reading> = (0..60)
            .map(|m| Reading::new(hour + TimeDelta::minutes(m), m as f64))
            .collect();

        let out = evaluate(&rule(Resolution::Mean1h), &source, None, hour + TimeDelta::hours(1));

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timestamp, hour);
        assert!((out[0].value - 29.5).abs() < 1e-9);
    }
}
