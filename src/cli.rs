//! Command-line interface.
//!
//! Every flag is optional here; required values (host, id, secret) may come
//! from the configuration file instead and are checked after merging.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sensate_transport::{Credentials, TransportKind};

use crate::{config::Config, print_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Mqtt,
    #[value(alias = "ws")]
    Websocket,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Mqtt => TransportKind::Mqtt,
            TransportArg::Websocket => TransportKind::Websocket,
        }
    }
}

/// Synthetic Sensate sensor: publishes a random measurement every interval
/// until interrupted.
#[derive(Debug, Default, Parser)]
#[command(name = "sensate-sensor", version, about)]
pub struct Cli {
    /// Broker host, or WebSocket host/URL
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Broker port (MQTT only, default 1883)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Sensor id
    #[arg(short, long)]
    pub id: Option<String>,

    /// Sensor secret
    #[arg(short, long)]
    pub secret: Option<String>,

    /// Broker username (MQTT only)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Broker password (MQTT only)
    #[arg(short = 'P', long)]
    pub pw: Option<String>,

    /// Transport to publish with
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportArg>,

    /// Milliseconds between measurements
    #[arg(short = 'I', long, value_name = "MS")]
    pub interval: Option<u64>,

    /// MQTT topic
    #[arg(short = 'T', long)]
    pub topic: Option<String>,

    /// MQTT publish QoS
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub qos: Option<u8>,

    /// Configuration file
    #[arg(short, long, env = "SENSATE_SENSOR_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Overwrites `config` with every flag that was given.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.transport.host = host.clone();
        }
        if let Some(port) = self.port {
            config.transport.port = Some(port);
        }
        if let Some(kind) = self.transport {
            config.transport.kind = kind.into();
        }
        if let Some(topic) = &self.topic {
            config.transport.topic = topic.clone();
        }
        if let Some(qos) = self.qos {
            config.transport.qos = qos;
        }
        if let Some(id) = &self.id {
            config.sensor.id = id.clone();
        }
        if let Some(secret) = &self.secret {
            config.sensor.secret = secret.clone();
        }
        if let Some(interval) = self.interval {
            config.sensor.interval_ms = interval;
        }
        if let Some(level) = &self.log_level {
            config.logger.level = level.clone();
        }

        if let Some(user) = &self.user {
            config
                .transport
                .credentials
                .get_or_insert_with(|| Credentials::new(String::new(), String::new()))
                .username = user.clone();
        }
        if let Some(pw) = &self.pw {
            match &mut config.transport.credentials {
                Some(credentials) => credentials.password = pw.clone(),
                None => print_warn!("--pw given without --user, ignoring it"),
            }
        }
    }
}
