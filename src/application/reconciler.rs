// Series reconciler - Aligns every series of a chart onto one time range
use crate::domain::chart::{ChartConfig, DEFAULT_MAX_POINTS};
use crate::domain::error::ChartError;
use crate::domain::resolution::SECONDS_PER_DAY;
use crate::domain::series::{Bounds, DataPoint, Series};

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    pub step: i64,
    pub default_y: f64,
    pub max_points: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            step: SECONDS_PER_DAY,
            default_y: 0.0,
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

impl From<&ChartConfig> for ReconcileOptions {
    fn from(config: &ChartConfig) -> Self {
        Self {
            step: config.step,
            default_y: config.default_y,
            max_points: config.max_points,
        }
    }
}

/// Number of padding points needed before and after one series
#[derive(Debug, Clone, Copy)]
struct Padding {
    prepend: u64,
    append: u64,
}

/// Sort every series by `x`, then pad each one with `default_y` points spaced
/// `step` apart until all of them start at the global minimum and end at the
/// global maximum. Series are rewritten in place.
///
/// The overflow check runs over every series before any padding is applied,
/// so a failing call leaves each series sorted but otherwise untouched.
/// Returns `None` when no series holds any point.
pub fn reconcile(series: &mut [Series], options: ReconcileOptions) -> Result<Option<Bounds>, ChartError> {
    if options.step <= 0 {
        return Err(ChartError::InvalidStep(options.step));
    }

    for s in series.iter_mut() {
        s.data.sort_by(|a, b| a.x.cmp(&b.x));
    }

    let Some(bounds) = global_bounds(series) else {
        return Ok(None);
    };

    let mut plan = Vec::with_capacity(series.len());
    for s in series.iter() {
        let padding = plan_padding(s, bounds, options.step)?;
        let len = s.data.len() as u64 + padding.prepend + padding.append;
        if len > options.max_points as u64 {
            tracing::error!(
                "Series '{}' would grow to {} points (max {}), range {}..{}",
                s.name,
                len,
                options.max_points,
                bounds.min_x,
                bounds.max_x
            );
            return Err(ChartError::Overflow {
                series: s.name.clone(),
                len,
                max: options.max_points,
            });
        }
        plan.push(padding);
    }

    for (s, padding) in series.iter_mut().zip(plan) {
        apply_padding(s, padding, bounds, options);
    }

    tracing::debug!(
        "Reconciled {} series onto {}..{}",
        series.len(),
        bounds.min_x,
        bounds.max_x
    );

    Ok(Some(bounds))
}

fn global_bounds(series: &[Series]) -> Option<Bounds> {
    series
        .iter()
        .filter_map(|s| Some((s.first_x()?, s.last_x()?)))
        .fold(None, |acc: Option<Bounds>, (first, last)| {
            Some(match acc {
                Some(b) => Bounds {
                    min_x: b.min_x.min(first),
                    max_x: b.max_x.max(last),
                },
                None => Bounds {
                    min_x: first,
                    max_x: last,
                },
            })
        })
}

fn steps_to_cover(distance: i128, step: i64) -> u64 {
    if distance <= 0 {
        return 0;
    }
    let step = step as i128;
    let steps = (distance + step - 1) / step;
    u64::try_from(steps).unwrap_or(u64::MAX)
}

fn plan_padding(series: &Series, bounds: Bounds, step: i64) -> Result<Padding, ChartError> {
    let (first, last, padding) = match (series.first_x(), series.last_x()) {
        (Some(first), Some(last)) => (
            first,
            last,
            Padding {
                prepend: steps_to_cover(first as i128 - bounds.min_x as i128, step),
                append: steps_to_cover(bounds.max_x as i128 - last as i128, step),
            },
        ),
        // An empty series is seeded with one point at `min_x`
        _ => (
            bounds.min_x,
            bounds.min_x,
            Padding {
                prepend: 0,
                append: steps_to_cover(bounds.max_x as i128 - bounds.min_x as i128, step),
            },
        ),
    };

    // The outermost padded points must stay within i64
    let offset = |n: u64| i64::try_from(n).ok().and_then(|n| n.checked_mul(step));
    let lowest = offset(padding.prepend).and_then(|d| first.checked_sub(d));
    let highest = offset(padding.append).and_then(|d| last.checked_add(d));
    if lowest.is_none() || highest.is_none() {
        tracing::error!(
            "Series '{}' cannot be padded by step {} onto {}..{}",
            series.name,
            step,
            bounds.min_x,
            bounds.max_x
        );
        return Err(ChartError::StepOutOfRange {
            series: series.name.clone(),
            step,
        });
    }

    if series.data.is_empty() {
        return Ok(Padding {
            prepend: 1,
            ..padding
        });
    }
    Ok(padding)
}

fn apply_padding(series: &mut Series, padding: Padding, bounds: Bounds, options: ReconcileOptions) {
    if padding.prepend == 0 && padding.append == 0 {
        return;
    }

    let step = options.step;
    let total = series.data.len() + (padding.prepend + padding.append) as usize;
    let mut data = Vec::with_capacity(total);

    match series.first_x() {
        Some(first) => {
            for k in (1..=padding.prepend as i64).rev() {
                data.push(DataPoint::new(first - k * step, options.default_y));
            }
        }
        None => data.push(DataPoint::new(bounds.min_x, options.default_y)),
    }

    data.append(&mut series.data);

    if let Some(last) = data.last().map(|p| p.x) {
        for k in 1..=padding.append as i64 {
            data.push(DataPoint::new(last + k * step, options.default_y));
        }
    }

    series.data = data;
}
