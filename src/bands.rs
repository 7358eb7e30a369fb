//! Per-band absolute power readings and the raw EEG burst.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::link::CHANNEL_COUNT;

/// Decimal places kept when a value is stored.
pub const INGEST_PRECISION: u32 = 5;

/// Decimal places of the raw EEG burst as handed to consumers.
pub const RAW_READ_PRECISION: u32 = 3;

/// Frequency bands in the order the headband sends them each cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Theta,
    Delta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Theta, Band::Delta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Last band of a cycle; its arrival marks the cycle as complete.
    pub const CYCLE_END: Band = Band::Gamma;

    pub fn name(self) -> &'static str {
        match self {
            Band::Theta => "theta",
            Band::Delta => "delta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type BandReading = [f64; CHANNEL_COUNT];

/// Round to `places` decimals, ties to even as Python's `round` does for
/// exactly representable halves. Values too large to carry any fraction at
/// that precision are returned unchanged.
pub fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    let scaled = value * scale;
    if !scaled.is_finite() || value.abs() >= 2f64.powi(52) / scale {
        return value;
    }
    scaled.round_ties_even() / scale
}

/// All five bands at once. Only built when every band has data.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<Band, BandReading>);

impl Snapshot {
    pub fn get(&self, band: Band) -> &BandReading {
        // Construction guarantees every band is present
        &self.0[&band]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, &BandReading)> {
        self.0.iter().map(|(band, reading)| (*band, reading))
    }
}

/// Latest accepted reading per band plus the latest raw burst.
///
/// Ingestion is not gated here; the session checks the link first.
#[derive(Debug, Default)]
pub struct BandAggregator {
    bands: [Option<BandReading>; 5],
    raw: Vec<f64>,
}

impl BandAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest_band(&mut self, band: Band, values: BandReading) {
        self.bands[band.index()] = Some(values.map(|v| round_to(v, INGEST_PRECISION)));
    }

    pub fn ingest_raw(&mut self, values: &[f64]) {
        self.raw.clear();
        self.raw
            .extend(values.iter().map(|&v| round_to(v, INGEST_PRECISION)));
    }

    pub fn reading(&self, band: Band) -> Option<&BandReading> {
        self.bands[band.index()].as_ref()
    }

    /// Every band, or `None` while any band has never been received.
    pub fn snapshot(&self) -> Option<Snapshot> {
        Band::ALL
            .iter()
            .map(|&band| self.reading(band).map(|reading| (band, *reading)))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(Snapshot)
    }

    pub fn raw_snapshot(&self) -> Vec<f64> {
        self.raw
            .iter()
            .map(|&v| round_to(v, RAW_READ_PRECISION))
            .collect()
    }
}
