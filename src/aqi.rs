//! PM2.5 severity classification.

use embedded_graphics::pixelcolor::{Rgb888, WebColors};

/// Air-quality severity category, ordered from least to most severe.
///
/// `Unknown` is reported for readings that did not parse as a number.
/// It stays distinct from `Hazardous` so that a data problem never
/// shows up as the worst measured air.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    Unknown,
}

impl Severity {
    /// Marker and legend color for this category.
    pub fn color(&self) -> Rgb888 {
        match self {
            Severity::Good => Rgb888::CSS_GREEN,
            Severity::Moderate => Rgb888::CSS_YELLOW,
            Severity::Unhealthy => Rgb888::CSS_ORANGE,
            Severity::VeryUnhealthy => Rgb888::CSS_RED,
            Severity::Hazardous => Rgb888::CSS_BLACK,
            Severity::Unknown => Rgb888::CSS_GRAY,
        }
    }

    /// Display label, as shown in popups and the legend.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Good => "Good",
            Severity::Moderate => "Moderate",
            Severity::Unhealthy => "Unhealthy",
            Severity::VeryUnhealthy => "Very Unhealthy",
            Severity::Hazardous => "Hazardous",
            Severity::Unknown => "Unknown",
        }
    }
}

/// One classification band: readings at or below `ceiling` (and above
/// the previous band's ceiling) fall into `severity`.
#[derive(Clone, Copy, Debug)]
pub struct Band {
    pub ceiling: f64,
    pub severity: Severity,
}

/// An ordered threshold table mapping a concentration to a [`Severity`].
///
/// Injected into the shell at construction; [`Scale::pm25`] is the table
/// the dataset is measured against.
#[derive(Clone, Debug)]
pub struct Scale {
    bands: Vec<Band>,
    overflow: Severity,
}

impl Scale {
    /// Build a scale from ascending bands; `overflow` is reported above
    /// the last ceiling.
    pub fn new(bands: Vec<Band>, overflow: Severity) -> Self {
        Scale { bands, overflow }
    }

    /// The PM2.5 scale, in ug/m3.
    pub fn pm25() -> Self {
        Scale::new(
            vec![
                Band { ceiling: 15.5, severity: Severity::Good },
                Band { ceiling: 55.4, severity: Severity::Moderate },
                Band { ceiling: 150.4, severity: Severity::Unhealthy },
                Band { ceiling: 250.4, severity: Severity::VeryUnhealthy },
            ],
            Severity::Hazardous,
        )
    }

    /// Classify a concentration.
    ///
    /// Bands are evaluated in ascending order with an inclusive ceiling;
    /// the first match wins, and anything above the last ceiling is the
    /// overflow category. `NaN` fails every comparison and lands in the
    /// overflow category as well.
    pub fn classify(&self, value: f64) -> Severity {
        for band in &self.bands {
            if value <= band.ceiling {
                return band.severity;
            }
        }
        self.overflow
    }

    /// Classify a validated reading. A missing (unparseable) value is
    /// [`Severity::Unknown`], never the overflow category.
    pub fn classify_reading(&self, value: Option<f64>) -> Severity {
        match value {
            Some(v) => self.classify(v),
            None => Severity::Unknown,
        }
    }

    /// The finite bands in ascending order, for legend rendering.
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// The category reported above the last ceiling.
    pub fn overflow(&self) -> Severity {
        self.overflow
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::pm25()
    }
}
