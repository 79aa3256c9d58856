//! The measurement send loop.
//!
//! `Publisher::run` connects the transport once and then repeats, strictly
//! in order and never overlapping:
//!
//! ```text
//! cancelled? -> generate -> serialize -> deliver -> receive (duplex only) -> sleep
//! ```
//!
//! The loop runs until its `CancellationToken` fires or a step fails. Any
//! failure ends the run unless `[transport.retry]` is enabled, in which case
//! connect and deliver are retried on a bounded `Backoff` schedule.

use std::time::Duration;

use sensate_transport::{Backoff, RetryConfig, TransferError, Transport};
use tokio::{sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use super::{
    error::PublishError,
    measurement::{serialize, MeasurementGenerator, SensorIdentity},
    state::{Lifecycle, PublisherState},
};

/// Default pause between two ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// 1-based tick counter.
    pub tick: u64,
    /// The JSON that was delivered.
    pub payload: String,
    /// The peer's answer, for transports that have one.
    pub reply: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Step<'a> {
    Connect,
    Deliver(&'a str),
}

impl Step<'_> {
    fn label(&self) -> &'static str {
        match self {
            Step::Connect => "Connect",
            Step::Deliver(_) => "Delivery",
        }
    }
}

pub struct Publisher {
    transport: Box<dyn Transport>,
    identity: SensorIdentity,
    generator: MeasurementGenerator,
    interval: Duration,
    retry: RetryConfig,
    cancel: CancellationToken,
    lifecycle: Lifecycle,
    ticks: u64,
}

impl Publisher {
    /// Creates an idle publisher with a 1 s interval, no retries and its own
    /// cancellation token.
    pub fn new(
        transport: Box<dyn Transport>,
        identity: SensorIdentity,
        generator: MeasurementGenerator,
    ) -> Self {
        Self {
            transport,
            identity,
            generator,
            interval: DEFAULT_INTERVAL,
            retry: RetryConfig::default(),
            cancel: CancellationToken::new(),
            lifecycle: Lifecycle::new(),
            ticks: 0,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the cancellation token, e.g. with a child of an
    /// application-wide one.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops `run` when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PublisherState> {
        self.lifecycle.subscribe()
    }

    pub fn state(&self) -> PublisherState {
        self.lifecycle.current_state()
    }

    /// Completed ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Connects the transport and ticks until cancelled or a step fails.
    ///
    /// The transport is disconnected before returning, on every path. A
    /// publisher runs once: after `run` returns its state is `Terminated`.
    ///
    /// # Errors
    ///
    /// The first failure that was not absorbed by the retry policy.
    #[instrument(skip(self), fields(transport = self.transport.name(), sensor = self.identity.id()))]
    pub async fn run(&mut self) -> Result<(), PublishError> {
        if self.state().is_terminated() {
            warn!("Publisher already terminated, not starting again");
            return Ok(());
        }

        let result = self.run_loop().await;

        if let Err(e) = self.transport.disconnect().await {
            warn!("Failed to disconnect transport: {}", e);
        }
        self.lifecycle.set_state(PublisherState::Terminated);

        match &result {
            Ok(()) => info!("Publisher stopped after {} ticks", self.ticks),
            Err(e) => error!("Publisher failed after {} ticks: {}", self.ticks, e),
        }
        result
    }

    async fn run_loop(&mut self) -> Result<(), PublishError> {
        let cancel = self.cancel.clone();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Cancelled before the transport was connected");
                return Ok(());
            }
            connected = self.run_step(Step::Connect) => connected?,
        }

        self.lifecycle.set_state(PublisherState::Running);
        info!(
            "Publishing via {} every {} ms",
            self.transport.name(),
            self.interval.as_millis()
        );

        loop {
            if cancel.is_cancelled() {
                info!("Cancellation requested");
                return Ok(());
            }

            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancellation requested during tick {}", self.ticks + 1);
                    return Ok(());
                }
                report = self.tick() => report?,
            };
            trace!("Tick {} done: {} bytes", report.tick, report.payload.len());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancellation requested");
                    return Ok(());
                }
                _ = sleep(self.interval) => {}
            }
        }
    }

    /// Runs one iteration without sleeping: generate, serialize, deliver and,
    /// when the transport answers, read exactly one reply.
    ///
    /// Replies are written to stdout and logged.
    pub async fn tick(&mut self) -> Result<TickReport, PublishError> {
        let measurement = self.generator.generate(&self.identity);
        let payload = serialize(&measurement)?;

        self.run_step(Step::Deliver(&payload)).await?;
        debug!("Delivered tick {} ({} bytes)", self.ticks + 1, payload.len());

        let reply = if self.transport.expects_reply() {
            self.transport.receive().await?
        } else {
            None
        };

        self.ticks += 1;
        if let Some(reply) = &reply {
            println!("{}", reply);
            info!("Reply to tick {}: {}", self.ticks, reply);
        }

        Ok(TickReport {
            tick: self.ticks,
            payload,
            reply,
        })
    }

    async fn attempt(&mut self, step: Step<'_>) -> Result<(), TransferError> {
        match step {
            Step::Connect => self.transport.connect().await,
            Step::Deliver(payload) => {
                if !self.transport.is_connected() {
                    debug!("Transport disconnected, reconnecting before delivery");
                    self.transport.connect().await?;
                }
                self.transport.deliver(payload).await
            }
        }
    }

    /// Runs `step` once, or on the backoff schedule when retry is enabled.
    async fn run_step(&mut self, step: Step<'_>) -> Result<(), TransferError> {
        if !self.retry.enabled {
            return match step {
                Step::Connect => self.transport.connect().await,
                Step::Deliver(payload) => self.transport.deliver(payload).await,
            };
        }

        let mut backoff = Backoff::from_config(&self.retry);
        loop {
            let err = match self.attempt(step).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            match backoff.next_sleep() {
                Ok(delay) => {
                    warn!(
                        "{} failed: {}. Retry {}/{} in {:?}",
                        step.label(),
                        err,
                        backoff.attempt(),
                        backoff.max_attempts(),
                        delay
                    );
                    sleep(delay).await;
                }
                Err(limit) => {
                    error!("{} failed: {} ({})", step.label(), err, limit);
                    return Err(err);
                }
            }
        }
    }
}
