//! Listener strategy selection from the host version.

use std::fmt;

/// First host version whose monitor channel also carries task failures.
pub const UNIFIED_MONITOR_MIN_VERSION: (u64, u64) = (13, 7);

/// How the monitor attaches to a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStrategy {
    /// One observe-only listener on the monitor channel.
    UnifiedMonitor,
    /// Separate listeners for panics and for unhandled task failures.
    LegacyDual,
}

impl MonitorStrategy {
    /// Pick the strategy for a host reporting `version`. Unparseable or
    /// missing versions fall back to [`MonitorStrategy::LegacyDual`].
    pub fn detect(version: Option<&str>) -> Self {
        let Some(version) = version else {
            return MonitorStrategy::LegacyDual;
        };
        let mut parts = version.trim().trim_start_matches('v').split('.');
        let major = parts.next().and_then(|p| p.parse::<u64>().ok());
        let minor = parts.next().and_then(|p| p.parse::<u64>().ok());

        let (min_major, min_minor) = UNIFIED_MONITOR_MIN_VERSION;
        let unified = match (major, minor) {
            (Some(major), _) if major > min_major => true,
            (Some(major), Some(minor)) => major == min_major && minor >= min_minor,
            _ => false,
        };

        if unified {
            MonitorStrategy::UnifiedMonitor
        } else {
            MonitorStrategy::LegacyDual
        }
    }
}

impl fmt::Display for MonitorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStrategy::UnifiedMonitor => f.write_str("unified-monitor"),
            MonitorStrategy::LegacyDual => f.write_str("legacy-dual"),
        }
    }
}
