//! Shared test utilities for integration tests
//!
//! Provides an isolated config home, a scripted host runtime and a sink that
//! records flushes into a shared event log.

use std::sync::{Arc, Mutex as StdMutex};

use beacon::client::{FlushOptions, TelemetrySink};
use beacon::contracts::{BaseData, Envelope};
use beacon::error::SinkError;
use beacon::exceptions::{FatalChannel, FatalHandler, HostRuntime, ListenerId};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: StdMutex<()> = StdMutex::new(());

/// Only one exception monitor may exist per process
pub static MONITOR_LOCK: StdMutex<()> = StdMutex::new(());

pub fn monitor_guard() -> std::sync::MutexGuard<'static, ()> {
    MONITOR_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
        }
    }

    fn restore(self) {
        match self.home {
            Some(orig) => std::env::set_var("HOME", orig),
            None => std::env::remove_var("HOME"),
        }
        match self.xdg_config_home {
            Some(orig) => std::env::set_var("XDG_CONFIG_HOME", orig),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into a fresh temp dir.
///
/// `f` receives the temp dir; the user-level config file lives at
/// `<dir>/config/beacon/config.toml`.
pub fn with_isolated_config_home<F, R>(f: F) -> R
where
    F: FnOnce(&TempDir) -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let state = EnvState::capture();

    let temp_dir = TempDir::new().unwrap();
    let config_home = temp_dir.path().join("config");
    std::fs::create_dir_all(&config_home).unwrap();
    std::env::set_var("HOME", temp_dir.path());
    std::env::set_var("XDG_CONFIG_HOME", &config_home);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&temp_dir)));
    state.restore();
    match result {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Host runtime whose channels are fired by hand and whose exit is recorded.
pub struct ScriptedHost {
    version: Option<String>,
    listeners: Mutex<Vec<(FatalChannel, ListenerId, FatalHandler)>>,
    next_id: Mutex<u64>,
    log: EventLog,
}

impl ScriptedHost {
    pub fn new(version: Option<&str>, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            version: version.map(str::to_string),
            listeners: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
            log,
        })
    }

    pub fn fire(&self, channel: FatalChannel, error: Option<beacon::contracts::ErrorInfo>) {
        let handlers: Vec<FatalHandler> = self
            .listeners
            .lock()
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(error.clone());
        }
    }
}

impl HostRuntime for ScriptedHost {
    fn version(&self) -> Option<String> {
        self.version.clone()
    }

    fn add_listener(&self, channel: FatalChannel, handler: FatalHandler) -> ListenerId {
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        let id = ListenerId(*next_id);
        self.listeners.lock().push((channel, id, handler));
        id
    }

    fn remove_listener(&self, channel: FatalChannel, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(c, listener, _)| !(*c == channel && *listener == id));
        listeners.len() != before
    }

    fn listener_count(&self, channel: FatalChannel) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .count()
    }

    fn exit(&self, code: i32) {
        self.log.lock().push(format!("exit:{code}"));
    }
}

/// Sink that logs each flush as `flush:<count>:<is_app_crashing>`.
pub struct RecordingSink {
    log: EventLog,
    envelopes: Mutex<Vec<Envelope>>,
}

impl RecordingSink {
    pub fn new(log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            envelopes: Mutex::new(Vec::new()),
        })
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().clone()
    }

    pub fn exception_messages(&self) -> Vec<String> {
        self.envelopes
            .lock()
            .iter()
            .filter_map(|envelope| match &envelope.data.base_data {
                BaseData::Exception(data) => Some(data.exceptions[0].message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn send(&self, batch: Vec<Envelope>, options: FlushOptions) -> Result<(), SinkError> {
        self.log
            .lock()
            .push(format!("flush:{}:{}", batch.len(), options.is_app_crashing));
        self.envelopes.lock().extend(batch);
        Ok(())
    }
}
