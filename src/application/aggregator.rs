// Resolution aggregator - Re-buckets a raw series into coarser time buckets
use crate::domain::resolution::Resolution;
use crate::domain::series::DataPoint;
use std::collections::HashMap;

/// Collapse `data` into buckets of the resolution's width, summing the `y`
/// values that land in the same bucket. O(n).
///
/// `Resolution::None` returns the input untouched. Otherwise the output holds
/// one point per distinct bucket, in no particular order; callers sort.
pub fn recompute_by_time(data: Vec<DataPoint>, resolution: Resolution) -> Vec<DataPoint> {
    let Some(width) = resolution.bucket_width() else {
        return data;
    };

    let mut buckets: HashMap<i64, f64> = HashMap::with_capacity(data.len());
    for point in &data {
        let bucket = point.x.div_euclid(width) * width;
        buckets
            .entry(bucket)
            .and_modify(|y| *y += point.y)
            .or_insert(point.y);
    }

    buckets
        .into_iter()
        .map(|(x, y)| DataPoint::new(x, y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sorted(mut data: Vec<DataPoint>) -> Vec<DataPoint> {
        data.sort_by(|a, b| a.x.cmp(&b.x));
        data
    }

    #[test]
    fn test_first_point_sets_bucket_value() {
        let out = recompute_by_time(vec![DataPoint::new(7200, -0.0)], Resolution::Daily);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].x, 0);
        assert!(out[0].y == 0.0 && out[0].y.is_sign_negative());
    }

    #[test]
    fn test_none_is_identity() {
        let data = vec![
            DataPoint::new(7200, 1.0),
            DataPoint::new(0, 2.0),
            DataPoint::new(7200, 3.0),
        ];
        assert_eq!(recompute_by_time(data.clone(), Resolution::None), data);
    }

    #[test]
    fn test_hourly_example() {
        let data = vec![
            DataPoint::new(0, 5.0),
            DataPoint::new(1800, 3.0),
            DataPoint::new(3600, 2.0),
        ];
        let result = sorted(recompute_by_time(data, Resolution::Hourly));
        assert_eq!(result, vec![DataPoint::new(0, 8.0), DataPoint::new(3600, 2.0)]);
    }

    #[test]
    fn test_daily_buckets() {
        let data = vec![
            DataPoint::new(86_399, 1.0),
            DataPoint::new(86_400, 10.0),
            DataPoint::new(90_000, 5.0),
            DataPoint::new(200_000, 4.0),
        ];
        let result = sorted(recompute_by_time(data, Resolution::Daily));
        assert_eq!(
            result,
            vec![
                DataPoint::new(0, 1.0),
                DataPoint::new(86_400, 15.0),
                DataPoint::new(172_800, 4.0),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(recompute_by_time(Vec::new(), Resolution::Hourly).is_empty());
        assert!(recompute_by_time(Vec::new(), Resolution::None).is_empty());
    }

    proptest! {
        #[test]
        fn prop_bucket_sums_and_count(
            raw in prop::collection::vec((0i64..2_000_000, -1_000i32..1_000), 0..200),
            hourly in any::<bool>(),
        ) {
            let resolution = if hourly { Resolution::Hourly } else { Resolution::Daily };
            let width = resolution.bucket_width().unwrap();
            let data: Vec<DataPoint> = raw
                .iter()
                .map(|&(x, y)| DataPoint::new(x, y as f64))
                .collect();

            let mut expected: HashMap<i64, f64> = HashMap::new();
            for p in &data {
                *expected.entry(p.x / width * width).or_insert(0.0) += p.y;
            }

            let result = recompute_by_time(data, resolution);
            prop_assert_eq!(result.len(), expected.len());
            for p in &result {
                prop_assert_eq!(p.x % width, 0);
                prop_assert_eq!(Some(&p.y), expected.get(&p.x));
            }
        }
    }
}
