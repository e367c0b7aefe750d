//! Host runtime seam for fatal-error notification.
//!
//! [`HostRuntime`] is what the monitor registers against. [`ProcessHost`] is
//! the implementation for a real process: panics arrive through the panic
//! hook, and failed background tasks arrive through [`ProcessHost::reject`]
//! or [`ProcessHost::watch_task`].

use std::cell::Cell;
use std::fmt;
use std::panic::PanicHookInfo;
use std::sync::{Arc, Once, OnceLock};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::contracts::ErrorInfo;

/// Notification channels a host raises fatal errors on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalChannel {
    /// Observe-only channel carrying both panics and task failures.
    UncaughtExceptionMonitor,
    /// Panics; listeners here take over default crash reporting.
    UncaughtException,
    /// Background tasks that failed with nobody awaiting the failure.
    UnhandledRejection,
}

impl FatalChannel {
    pub fn name(&self) -> &'static str {
        match self {
            FatalChannel::UncaughtExceptionMonitor => "uncaughtExceptionMonitor",
            FatalChannel::UncaughtException => "uncaughtException",
            FatalChannel::UnhandledRejection => "unhandledRejection",
        }
    }
}

impl fmt::Display for FatalChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Listener callback. `None` means the failure carried no error value.
pub type FatalHandler = Arc<dyn Fn(Option<ErrorInfo>) + Send + Sync>;

/// Handle returned by [`HostRuntime::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub trait HostRuntime: Send + Sync {
    /// Host version string (`major.minor.patch`), when known.
    fn version(&self) -> Option<String>;

    fn add_listener(&self, channel: FatalChannel, handler: FatalHandler) -> ListenerId;

    /// Returns `false` if `id` was not registered on `channel`.
    fn remove_listener(&self, channel: FatalChannel, id: ListenerId) -> bool;

    fn listener_count(&self, channel: FatalChannel) -> usize;

    /// Terminate the process with `code`.
    fn exit(&self, code: i32);
}

/// Host protocol revision delivered by [`ProcessHost`]: the monitor channel
/// carries both panics and task failures.
pub const PROCESS_HOST_VERSION: &str = "14.0.0";

struct Registry {
    next_id: u64,
    listeners: Vec<(FatalChannel, ListenerId, FatalHandler)>,
}

impl Registry {
    fn handlers(&self, channel: FatalChannel) -> Vec<FatalHandler> {
        self.listeners
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect()
    }
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Mutex::new(Registry {
            next_id: 1,
            listeners: Vec::new(),
        })
    })
}

static PANIC_HOOK: Once = Once::new();

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Process-wide host backed by the panic hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHost;

impl ProcessHost {
    pub fn new() -> Self {
        ProcessHost
    }

    /// Report a background failure nobody is going to observe.
    pub fn reject(&self, error: Option<ErrorInfo>) {
        let delivered = guarded(|| {
            dispatch(FatalChannel::UncaughtExceptionMonitor, &error)
                + dispatch(FatalChannel::UnhandledRejection, &error)
        });
        match (delivered, &error) {
            (Some(0), Some(error)) => warn!(error = %error, "unhandled task failure"),
            (Some(0), None) => warn!("unhandled task failure without an error value"),
            (None, Some(error)) => warn!(
                error = %error,
                "task failure raised while a fatal error is being dispatched; dropped"
            ),
            (None, None) => {
                warn!("task failure raised while a fatal error is being dispatched; dropped")
            }
            (Some(_), _) => {}
        }
    }

    /// Await a spawned task and report an `Err` outcome through [`ProcessHost::reject`].
    ///
    /// Panicking tasks already went through the panic hook and are not reported twice.
    pub async fn watch_task<T, E>(&self, handle: JoinHandle<Result<T, E>>) -> Option<T>
    where
        E: std::error::Error + 'static,
    {
        match handle.await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                self.reject(Some(ErrorInfo::from_error(&err)));
                None
            }
            Err(join_err) => {
                if join_err.is_cancelled() {
                    warn!("watched task was cancelled");
                }
                None
            }
        }
    }

    fn install_panic_hook() {
        PANIC_HOOK.call_once(|| {
            let previous = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| on_panic(info, &*previous)));
        });
    }
}

impl HostRuntime for ProcessHost {
    fn version(&self) -> Option<String> {
        Some(PROCESS_HOST_VERSION.to_string())
    }

    fn add_listener(&self, channel: FatalChannel, handler: FatalHandler) -> ListenerId {
        Self::install_panic_hook();
        let mut registry = registry().lock();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((channel, id, handler));
        id
    }

    fn remove_listener(&self, channel: FatalChannel, id: ListenerId) -> bool {
        let mut registry = registry().lock();
        let before = registry.listeners.len();
        registry
            .listeners
            .retain(|(c, listener, _)| !(*c == channel && *listener == id));
        registry.listeners.len() != before
    }

    fn listener_count(&self, channel: FatalChannel) -> usize {
        registry()
            .lock()
            .listeners
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .count()
    }

    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

fn on_panic(info: &PanicHookInfo<'_>, previous: &PanicHook) {
    let handled = guarded(|| {
        let error = Some(ErrorInfo::from_panic(info));
        dispatch(FatalChannel::UncaughtExceptionMonitor, &error);
        dispatch(FatalChannel::UncaughtException, &error) > 0
    });
    // Nested panics and unclaimed panics keep the default report.
    if handled != Some(true) {
        previous(info);
    }
}

/// Run `f` unless this thread is already dispatching a fatal error.
fn guarded<R>(f: impl FnOnce() -> R) -> Option<R> {
    struct Reset;
    impl Drop for Reset {
        fn drop(&mut self) {
            DISPATCHING.with(|flag| flag.set(false));
        }
    }

    if DISPATCHING.with(|flag| flag.replace(true)) {
        return None;
    }
    let _reset = Reset;
    Some(f())
}

/// Invoke every listener on `channel`; returns how many ran.
fn dispatch(channel: FatalChannel, error: &Option<ErrorInfo>) -> usize {
    // Handlers run without the registry lock so they may add or remove listeners.
    let handlers = registry().lock().handlers(channel);
    for handler in &handlers {
        handler(error.clone());
    }
    handlers.len()
}
