//! Measurement model, random generator and JSON serializer.
//!
//! A measurement is built fresh on every tick and thrown away once it has
//! been serialized. The wire field names are what the ingestion backend
//! parses, so they are pinned with serde attributes:
//!
//! ```json
//! {
//!   "Longitude": 4.7769,
//!   "Latitude": 51.58307,
//!   "CreatedById": "sensor-1",
//!   "CreatedBySecret": "abc",
//!   "Data": [{"Name": "x", "Value": 3.2}, {"Name": "y", "Value": 71.0}, {"Name": "z", "Value": 12.5}]
//! }
//! ```
//!
//! Over the duplex channel `Data` is `{"Volts": 42.1}` instead.

use std::fmt;

use rand::{rngs::StdRng, Rng, SeedableRng};
use sensate_transport::TransportKind;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// Fixed longitude of the simulated sensor.
pub const LONGITUDE: f64 = 4.7769;
/// Fixed latitude of the simulated sensor.
pub const LATITUDE: f64 = 51.58307;

/// Broker sample channels with their exclusive upper bounds.
const CHANNELS: [(&str, f64); 3] = [("x", 10.0), ("y", 100.0), ("z", 20.0)];
/// Exclusive upper bound of the duplex voltage reading.
const VOLTS_BOUND: f64 = 100.0;

/// Who the backend attributes a measurement to.
///
/// Both fields are checked to be non-empty on construction and cannot be
/// changed afterwards.
#[derive(Clone, PartialEq, Eq, Validate)]
pub struct SensorIdentity {
    #[validate(length(min = 1, message = "sensor id must not be empty"))]
    id: String,
    #[validate(length(min = 1, message = "sensor secret must not be empty"))]
    secret: String,
}

impl SensorIdentity {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Result<Self, ValidationErrors> {
        let identity = Self {
            id: id.into(),
            secret: secret.into(),
        };
        identity.validate()?;
        Ok(identity)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for SensorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorIdentity")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One named sample of the broker payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sample {
    pub name: String,
    pub value: f64,
}

/// Voltage reading of the duplex payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoltageReading {
    pub volts: f64,
}

/// Body of the `Data` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementData {
    Samples(Vec<Sample>),
    Volts(VoltageReading),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Measurement {
    pub longitude: f64,
    pub latitude: f64,
    pub created_by_id: String,
    pub created_by_secret: String,
    pub data: MeasurementData,
}

/// Which `Data` variant the generator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `x`, `y`, `z` samples, sent to the broker.
    Samples,
    /// A single voltage, sent over the duplex channel.
    Volts,
}

impl From<TransportKind> for PayloadShape {
    fn from(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Mqtt => PayloadShape::Samples,
            TransportKind::Websocket => PayloadShape::Volts,
        }
    }
}

/// Produces measurements with fresh pseudo-random values on every call.
///
/// Values are drawn as `rng.gen::<f64>() * bound`, so each lies in the
/// half-open range `[0, bound)`.
#[derive(Debug)]
pub struct MeasurementGenerator<R = StdRng> {
    rng: R,
    shape: PayloadShape,
}

impl MeasurementGenerator<StdRng> {
    /// Generator seeded from OS entropy.
    pub fn new(shape: PayloadShape) -> Self {
        Self::with_rng(shape, StdRng::from_entropy())
    }

    /// Deterministic generator, for reproducible runs.
    pub fn seeded(shape: PayloadShape, seed: u64) -> Self {
        Self::with_rng(shape, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> MeasurementGenerator<R> {
    pub fn with_rng(shape: PayloadShape, rng: R) -> Self {
        Self { rng, shape }
    }

    pub fn shape(&self) -> PayloadShape {
        self.shape
    }

    pub fn generate(&mut self, identity: &SensorIdentity) -> Measurement {
        let data = match self.shape {
            PayloadShape::Samples => MeasurementData::Samples(
                CHANNELS
                    .iter()
                    .map(|&(name, bound)| Sample {
                        name: name.to_string(),
                        value: self.rng.gen::<f64>() * bound,
                    })
                    .collect(),
            ),
            PayloadShape::Volts => MeasurementData::Volts(VoltageReading {
                volts: self.rng.gen::<f64>() * VOLTS_BOUND,
            }),
        };

        Measurement {
            longitude: LONGITUDE,
            latitude: LATITUDE,
            created_by_id: identity.id().to_string(),
            created_by_secret: identity.secret().to_string(),
            data,
        }
    }
}

/// Serializes a measurement to its JSON wire form.
pub fn serialize(measurement: &Measurement) -> Result<String, serde_json::Error> {
    serde_json::to_string(measurement)
}
