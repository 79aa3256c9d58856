//! sensate-sensor: synthetic IoT sensor for exercising the Sensate ingestion
//! backend.
//!
//! The agent fabricates a geolocated measurement on a fixed cadence and
//! delivers it either to an MQTT broker (one short session per measurement)
//! or over a long-lived WebSocket that answers every frame.
//!
//! ## Modules
//!
//! * `config` - TOML configuration, command-line overrides and validation
//!   via `validator`.
//! * `cli` - `clap` definition of the command line.
//! * `core` - measurement model and generator, the publisher loop and its
//!   lifecycle state.
//! * `logger` - `tracing` subscriber setup with console and journald output.
//!
//! Transports live in the `sensate-transport` crate and are selected with
//! the `mqtt` and `websocket` features (both on by default).

pub mod cli;
pub mod config;
pub mod core;
pub mod logger;
