//! Transport collaborator interface and the in-process sinks shipped with the crate.

use std::io::Write;

use parking_lot::Mutex;

use crate::client::FlushOptions;
use crate::contracts::Envelope;
use crate::error::SinkError;

/// Receives flushed envelopes. Network delivery, retry and spooling live behind this trait.
///
/// `send` is called on every flush, with an empty batch when nothing was
/// buffered, so a sink can flush its own state. When
/// `options.is_app_crashing` is set the call must complete synchronously.
pub trait TelemetrySink: Send + Sync {
    fn send(&self, batch: Vec<Envelope>, options: FlushOptions) -> Result<(), SinkError>;
}

/// Keeps every envelope in memory.
#[derive(Default)]
pub struct MemorySink {
    envelopes: Mutex<Vec<Envelope>>,
    flushes: Mutex<Vec<FlushOptions>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().clone()
    }

    /// Options of every flush received, oldest first.
    pub fn flushes(&self) -> Vec<FlushOptions> {
        self.flushes.lock().clone()
    }

    pub fn clear(&self) {
        self.envelopes.lock().clear();
        self.flushes.lock().clear();
    }
}

impl TelemetrySink for MemorySink {
    fn send(&self, batch: Vec<Envelope>, options: FlushOptions) -> Result<(), SinkError> {
        self.envelopes.lock().extend(batch);
        self.flushes.lock().push(options);
        Ok(())
    }
}

/// Writes one JSON envelope per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesSink<W> {
    fn send(&self, batch: Vec<Envelope>, _options: FlushOptions) -> Result<(), SinkError> {
        let mut writer = self.writer.lock();
        for envelope in &batch {
            serde_json::to_writer(&mut *writer, envelope)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
