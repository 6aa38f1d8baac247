// CSV export of a chart's current series
use crate::domain::error::ChartError;
use crate::domain::series::Series;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvDelimiter {
    #[default]
    Comma,
    Colon,
}

impl CsvDelimiter {
    pub fn as_char(self) -> char {
        match self {
            CsvDelimiter::Comma => ',',
            CsvDelimiter::Colon => ':',
        }
    }
}

/// One exported row
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    pub name: String,
    pub x: i64,
    pub y: f64,
}

/// Header `name,x,y` followed by one row per point, series by series
pub fn to_csv(series: &[Series], delimiter: CsvDelimiter) -> String {
    let d = delimiter.as_char();
    let mut csv = format!("name{d}x{d}y\n");

    for s in series {
        for point in &s.data {
            csv.push_str(&format!("{}{d}{}{d}{}\n", s.name, point.x, point.y));
        }
    }

    csv
}

/// Read an export back into records. `x` and `y` are split off the right so
/// series names may contain the delimiter.
pub fn parse_csv(text: &str, delimiter: CsvDelimiter) -> Result<Vec<CsvRecord>, ChartError> {
    let d = delimiter.as_char();
    let mut lines = text.lines().enumerate();

    match lines.next() {
        Some((_, header)) if header == format!("name{d}x{d}y") => {}
        Some((_, header)) => {
            return Err(ChartError::Csv {
                line: 1,
                reason: format!("unexpected header '{}'", header),
            });
        }
        None => return Ok(Vec::new()),
    }

    let mut records = Vec::new();
    for (idx, line) in lines {
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let malformed = |reason: String| ChartError::Csv { line: line_no, reason };

        let mut fields = line.rsplitn(3, d);
        let (Some(y), Some(x), Some(name)) = (fields.next(), fields.next(), fields.next()) else {
            return Err(malformed(format!("expected 3 fields in '{}'", line)));
        };

        records.push(CsvRecord {
            name: name.to_string(),
            x: x.parse().map_err(|e| malformed(format!("bad x '{}': {}", x, e)))?,
            y: y.parse().map_err(|e| malformed(format!("bad y '{}': {}", y, e)))?,
        });
    }

    Ok(records)
}
