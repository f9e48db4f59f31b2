//! Station records and the bundled dataset.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::geo::Coordinate;

/// The station list compiled into the binary.
pub const BUNDLED_JSON: &str = include_str!("../data/stations.json");

/// A pollutant reading as it appears in the dataset.
///
/// Numbers and numeric strings both occur, and some entries are not
/// numeric at all. The raw text is kept for display; `value` is the
/// validated concentration.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    raw: String,
    value: Option<f64>,
}

impl Reading {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let value = raw.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        Reading { raw, value }
    }

    /// The validated concentration, if the dataset entry was numeric.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// The dataset text, for display in popups.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl From<f64> for Reading {
    fn from(v: f64) -> Self {
        Reading {
            raw: format!("{v}"),
            value: v.is_finite().then_some(v),
        }
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumberOrText {
            Number(f64),
            Text(String),
        }
        Ok(match NumberOrText::deserialize(de)? {
            NumberOrText::Number(v) => Reading::from(v),
            NumberOrText::Text(s) => Reading::parse(s),
        })
    }
}

/// A fixed air-quality monitoring station.
#[derive(Clone, Debug, Deserialize)]
pub struct Station {
    pub id: u32,
    pub name: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub pm25: Reading,
    pub pm10: Reading,
    pub o3: Reading,
}

impl Station {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("station dataset is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parse a station list. Order is preserved, and the list is immutable
/// once loaded.
pub fn load(json: &str) -> Result<Vec<Station>, DatasetError> {
    Ok(serde_json::from_str(json)?)
}
