//! Process-wide fatal-error monitor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::client::{FlushOptions, TelemetryClient};
use crate::contracts::{ErrorInfo, ExceptionTelemetry};
use crate::error::{ClientError, MonitorError};
use crate::exceptions::host::{FatalChannel, FatalHandler, HostRuntime, ListenerId};
use crate::exceptions::strategy::MonitorStrategy;

/// Set while a monitor exists in this process.
static MONITOR_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Lifecycle state of an [`ExceptionMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Created; `enable` has never been called.
    Uninitialized,
    Enabled,
    Disabled,
}

#[derive(Default)]
struct Bindings {
    initialized: bool,
    exception: Option<(FatalChannel, ListenerId)>,
    rejection: Option<(FatalChannel, ListenerId)>,
}

/// Reports fatal errors as exception telemetry and flushes before the process dies.
///
/// At most one monitor exists per process. Dropping it (or calling
/// [`ExceptionMonitor::dispose`]) removes its listeners and frees the slot.
pub struct ExceptionMonitor {
    client: Arc<TelemetryClient>,
    host: Arc<dyn HostRuntime>,
    strategy: MonitorStrategy,
    bindings: Mutex<Bindings>,
}

impl ExceptionMonitor {
    /// Claim the process-wide slot. The listener strategy is chosen here, once.
    pub fn new(
        client: Arc<TelemetryClient>,
        host: Arc<dyn HostRuntime>,
    ) -> Result<Self, MonitorError> {
        if MONITOR_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MonitorError::AlreadyConfigured);
        }

        let version = host.version();
        let strategy = MonitorStrategy::detect(version.as_deref());
        debug!(host_version = ?version, %strategy, "exception monitor created");
        Ok(Self {
            client,
            host,
            strategy,
            bindings: Mutex::new(Bindings::default()),
        })
    }

    /// Create a monitor and enable it when the client is configured to collect exceptions.
    pub fn install(
        client: Arc<TelemetryClient>,
        host: Arc<dyn HostRuntime>,
    ) -> Result<Option<Self>, ClientError> {
        if !client.config().auto_collect_exceptions {
            return Ok(None);
        }
        let monitor = Self::new(client, host)?;
        monitor.enable(true);
        Ok(Some(monitor))
    }

    pub fn strategy(&self) -> MonitorStrategy {
        self.strategy
    }

    /// Whether `enable` has been called at least once.
    pub fn is_initialized(&self) -> bool {
        self.bindings.lock().initialized
    }

    pub fn state(&self) -> MonitorState {
        let bindings = self.bindings.lock();
        match (bindings.initialized, bindings.exception.is_some()) {
            (false, _) => MonitorState::Uninitialized,
            (true, true) => MonitorState::Enabled,
            (true, false) => MonitorState::Disabled,
        }
    }

    /// Attach or detach the listeners. Repeated calls with the same value are no-ops.
    pub fn enable(&self, enabled: bool) {
        let mut bindings = self.bindings.lock();
        if enabled {
            bindings.initialized = true;
            if bindings.exception.is_some() {
                return;
            }
            match self.strategy {
                MonitorStrategy::UnifiedMonitor => {
                    bindings.exception =
                        Some(self.listen(FatalChannel::UncaughtExceptionMonitor, false));
                }
                MonitorStrategy::LegacyDual => {
                    bindings.exception = Some(self.listen(FatalChannel::UncaughtException, true));
                    bindings.rejection =
                        Some(self.listen(FatalChannel::UnhandledRejection, false));
                }
            }
            info!(strategy = %self.strategy, "exception monitor enabled");
        } else {
            let bound = [bindings.exception.take(), bindings.rejection.take()];
            let mut removed = false;
            for (channel, id) in bound.into_iter().flatten() {
                removed |= self.host.remove_listener(channel, id);
            }
            if removed {
                info!("exception monitor disabled");
            }
        }
    }

    pub fn disable(&self) {
        self.enable(false);
    }

    /// Detach and release the process-wide slot.
    pub fn dispose(self) {
        drop(self);
    }

    fn listen(&self, channel: FatalChannel, re_throw: bool) -> (FatalChannel, ListenerId) {
        // Only the legacy panic listener decides process exit.
        let exit_channel = re_throw.then_some(channel);
        let id = self.host.add_listener(channel, self.handler(exit_channel));
        (channel, id)
    }

    fn handler(&self, exit_channel: Option<FatalChannel>) -> FatalHandler {
        let client = Arc::clone(&self.client);
        let host = Arc::clone(&self.host);
        Arc::new(move |error: Option<ErrorInfo>| {
            handle_fatal(&client, host.as_ref(), exit_channel, error)
        })
    }
}

impl Drop for ExceptionMonitor {
    fn drop(&mut self) {
        self.enable(false);
        MONITOR_ACTIVE.store(false, Ordering::Release);
        debug!("exception monitor disposed");
    }
}

/// Track, flush synchronously, then exit if nothing else is listening on `exit_channel`.
fn handle_fatal(
    client: &TelemetryClient,
    host: &dyn HostRuntime,
    exit_channel: Option<FatalChannel>,
    error: Option<ErrorInfo>,
) {
    let error = error.unwrap_or_else(ErrorInfo::fallback);
    client.track_exception(ExceptionTelemetry::new(error.clone()));
    if let Err(err) = client.flush(FlushOptions::crashing()) {
        warn!(error = %err, "failed to flush telemetry before crash");
    }

    let Some(channel) = exit_channel else {
        return;
    };
    if host.listener_count(channel) == 1 {
        report_crash(&error);
        host.exit(1);
    }
}

fn report_crash(error: &ErrorInfo) {
    if tracing::dispatcher::has_been_set() {
        error!(error = %error, stack = error.stack.as_deref().unwrap_or(""), "uncaught error");
    } else {
        eprintln!("{error}");
        if let Some(stack) = &error.stack {
            eprintln!("{stack}");
        }
    }
}
