// Hover and axis label formatters for rendered charts
use super::chart::Docs;
use super::resolution::SECONDS_PER_DAY;
use super::series::Series;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatter {
    #[default]
    #[serde(rename = "timeseries_1")]
    Timeseries1,
    #[serde(rename = "timeseries_2")]
    Timeseries2,
    TimeseriesNoCommas,
    #[serde(rename = "integer_1")]
    Integer1,
    Confidence,
    #[serde(rename = "dynamic_docs_1")]
    DynamicDocs1,
}

impl Formatter {
    /// Look up a formatter by name, falling back to `timeseries_1`
    pub fn from_name(name: &str) -> Self {
        match name {
            "timeseries_1" => Formatter::Timeseries1,
            "timeseries_2" => Formatter::Timeseries2,
            "timeseries_no_commas" => Formatter::TimeseriesNoCommas,
            "integer_1" => Formatter::Integer1,
            "confidence" => Formatter::Confidence,
            "dynamic_docs_1" => Formatter::DynamicDocs1,
            other => {
                if !other.is_empty() {
                    tracing::debug!("Unknown formatter '{}', using timeseries_1", other);
                }
                Formatter::Timeseries1
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Formatter::Timeseries1 => "timeseries_1",
            Formatter::Timeseries2 => "timeseries_2",
            Formatter::TimeseriesNoCommas => "timeseries_no_commas",
            Formatter::Integer1 => "integer_1",
            Formatter::Confidence => "confidence",
            Formatter::DynamicDocs1 => "dynamic_docs_1",
        }
    }

    /// Hover text for a single point of `series`
    pub fn hover(self, series: &Series, x: i64, y: f64) -> String {
        match self {
            Formatter::Timeseries1 | Formatter::DynamicDocs1 => format!(
                "{}: {}\n{} {}H",
                series.name,
                number_with_commas(y),
                date_string(x),
                label_time(x).map(|t| t.hour()).unwrap_or_default()
            ),
            Formatter::Timeseries2 => {
                let (hour, minute) = label_time(x)
                    .map(|t| (t.hour(), t.minute()))
                    .unwrap_or_default();
                format!(
                    "{}: {}\n{} {}:{}",
                    series.name,
                    number_with_commas(y),
                    date_string(x),
                    hour,
                    minute
                )
            }
            Formatter::TimeseriesNoCommas => format!(
                "{}: {}\n{} {}H",
                series.name,
                y,
                date_string(x),
                label_time(x).map(|t| t.hour()).unwrap_or_default()
            ),
            Formatter::Integer1 => format!(
                "{}: {},{}",
                series.name,
                number_with_commas(x as f64),
                number_with_commas(y)
            ),
            Formatter::Confidence => format!("{} count: {}", series.name, number_with_commas(y)),
        }
    }

    /// Axis label for an x value
    pub fn x_label(self, x: i64) -> String {
        match self {
            Formatter::Timeseries1 | Formatter::TimeseriesNoCommas | Formatter::DynamicDocs1 => {
                date_string(x)
            }
            Formatter::Timeseries2 => label_time(x)
                .map(|t| t.to_rfc2822())
                .unwrap_or_else(|| x.to_string()),
            Formatter::Integer1 => number_with_commas(x as f64),
            Formatter::Confidence => format!("Confidence Level - {}", x),
        }
    }

    /// Per-series documentation shown alongside the hover detail
    pub fn docs_for<'a>(self, docs: Option<&'a Docs>, series_name: &str) -> Option<&'a str> {
        match (self, docs) {
            (Formatter::DynamicDocs1, Some(Docs::PerSeries(map))) => {
                map.get(series_name).map(String::as_str)
            }
            _ => None,
        }
    }
}

/// Timestamps are labelled one day ahead of the bucket start.
fn label_time(x: i64) -> Option<DateTime<Utc>> {
    x.checked_add(SECONDS_PER_DAY)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn date_string(x: i64) -> String {
    label_time(x)
        .map(|t| t.format("%a %b %d %Y").to_string())
        .unwrap_or_else(|| x.to_string())
}

/// Insert thousands separators into the integer part of a number
pub fn number_with_commas(value: f64) -> String {
    let text = value.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
