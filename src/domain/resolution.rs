// Time resolution used to re-bucket raw series
use super::error::ChartError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SECONDS_PER_HOUR: i64 = 3600;
pub const SECONDS_PER_DAY: i64 = 3600 * 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    None,
    Hourly,
    #[default]
    Daily,
}

impl Resolution {
    /// Width of one bucket in seconds, `None` for passthrough
    pub fn bucket_width(self) -> Option<i64> {
        match self {
            Resolution::None => None,
            Resolution::Hourly => Some(SECONDS_PER_HOUR),
            Resolution::Daily => Some(SECONDS_PER_DAY),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::None => "none",
            Resolution::Hourly => "hourly",
            Resolution::Daily => "daily",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "default" | "res_default" => Ok(Resolution::None),
            "hourly" | "res_hourly" => Ok(Resolution::Hourly),
            "daily" | "res_daily" => Ok(Resolution::Daily),
            _ => Err(ChartError::UnknownResolution(s.to_string())),
        }
    }
}

// Config files and HTTP paths share one case-insensitive parser
impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
