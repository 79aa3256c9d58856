//! Runtime core: measurement model, the publisher loop and its lifecycle.

pub mod error;
pub mod measurement;
pub mod publisher;
pub mod state;

pub use error::PublishError;
pub use measurement::{Measurement, MeasurementGenerator, PayloadShape, SensorIdentity};
pub use publisher::{Publisher, TickReport};
pub use state::PublisherState;
