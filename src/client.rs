//! Telemetry client: builds envelopes, runs the processor chain, buffers and flushes.
//!
//! Every tracked item goes through [`create_envelope`], then the sampling
//! processor, then any registered processors in order. Surviving envelopes are
//! buffered until [`TelemetryClient::flush`] or until `max_buffer_size` is
//! reached, at which point they are handed to the [`TelemetrySink`].

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::context::{CorrelationContext, TelemetryContext};
use crate::contracts::{Envelope, ExceptionTelemetry, TelemetryItem};
use crate::envelope::create_envelope;
use crate::error::ClientError;
use crate::sampling::should_sample;

mod buffer;
pub mod sink;

use buffer::EnvelopeBuffer;
pub use sink::{JsonLinesSink, MemorySink, TelemetrySink};

/// Telemetry processor: may mutate the envelope; returning `false` drops it.
pub type TelemetryProcessor =
    Box<dyn Fn(&mut Envelope, Option<&CorrelationContext>) -> bool + Send + Sync>;

/// Options passed through to the sink on flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOptions {
    /// The process is about to terminate; the sink must finish synchronously.
    pub is_app_crashing: bool,
}

impl FlushOptions {
    pub fn crashing() -> Self {
        Self {
            is_app_crashing: true,
        }
    }
}

pub struct TelemetryClient {
    config: ClientConfig,
    context: TelemetryContext,
    processors: RwLock<Vec<TelemetryProcessor>>,
    buffer: EnvelopeBuffer,
    sink: Arc<dyn TelemetrySink>,
}

impl TelemetryClient {
    /// Create a client with context read from the running process.
    pub fn new(config: ClientConfig, sink: Arc<dyn TelemetrySink>) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            config,
            context: TelemetryContext::from_process(),
            processors: RwLock::new(Vec::new()),
            buffer: EnvelopeBuffer::new(),
            sink,
        })
    }

    /// Replace the default context tags.
    pub fn with_context(mut self, context: TelemetryContext) -> Self {
        self.context = context;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn context(&self) -> &TelemetryContext {
        &self.context
    }

    /// Append a processor. Processors run after sampling, in registration order.
    pub fn add_processor<F>(&self, processor: F)
    where
        F: Fn(&mut Envelope, Option<&CorrelationContext>) -> bool + Send + Sync + 'static,
    {
        self.processors.write().push(Box::new(processor));
    }

    /// Track an item outside any correlated operation. Returns whether it was buffered.
    pub fn track(&self, item: impl Into<TelemetryItem>) -> bool {
        self.track_correlated(item, None)
    }

    /// Track an item belonging to the operation described by `correlation`.
    pub fn track_correlated(
        &self,
        item: impl Into<TelemetryItem>,
        correlation: Option<&CorrelationContext>,
    ) -> bool {
        let item = item.into();
        let mut envelope = create_envelope(
            &item,
            Some(&self.config.common_properties),
            Some(&self.context),
            correlation,
            Some(&self.config),
        );

        if !should_sample(&envelope, correlation) {
            return false;
        }

        // Recursive read: a fault raised inside a processor re-enters track_exception.
        let processors = self.processors.read_recursive();
        for processor in processors.iter() {
            if !processor(&mut envelope, correlation) {
                debug!(envelope = %envelope.name, "telemetry item dropped by processor");
                return false;
            }
        }
        drop(processors);

        let pending = self.buffer.push(envelope);
        if self.config.max_buffer_size > 0 && pending >= self.config.max_buffer_size {
            if let Err(err) = self.flush(FlushOptions::default()) {
                warn!(error = %err, pending, "automatic flush failed");
            }
        }
        true
    }

    pub fn track_exception(&self, telemetry: ExceptionTelemetry) -> bool {
        self.track(telemetry)
    }

    /// Number of envelopes waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.buffer.pending()
    }

    /// Hand buffered envelopes to the sink. Returns how many were sent.
    ///
    /// Blocks while another thread is flushing. On return, every envelope
    /// buffered before the call has been handed to the sink.
    pub fn flush(&self, options: FlushOptions) -> Result<usize, ClientError> {
        self.buffer.drain_into(|batch| {
            let count = batch.len();
            debug!(
                count,
                is_app_crashing = options.is_app_crashing,
                "flushing telemetry"
            );
            self.sink.send(batch, options)?;
            Ok(count)
        })
    }
}
