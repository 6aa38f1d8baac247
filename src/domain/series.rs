// Series data domain models
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Unix timestamp in seconds
    pub x: i64,
    pub y: f64,
}

impl DataPoint {
    pub fn new(x: i64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

impl Series {
    pub fn new(name: impl Into<String>, color: impl Into<String>, data: Vec<DataPoint>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            data,
        }
    }

    pub fn first_x(&self) -> Option<i64> {
        self.data.first().map(|p| p.x)
    }

    pub fn last_x(&self) -> Option<i64> {
        self.data.last().map(|p| p.x)
    }
}

/// Time range shared by every series of a reconciled chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub min_x: i64,
    pub max_x: i64,
}

impl Bounds {
    pub fn contains(&self, x: i64) -> bool {
        x >= self.min_x && x <= self.max_x
    }
}
