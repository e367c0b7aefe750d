//! Sampling: a portable hash-based coin flip that every SDK sharing a trace agrees on.

use rand::Rng;
use tracing::debug;

use crate::context::CorrelationContext;
use crate::contracts::{Envelope, TelemetryKind};

/// Seed of the djb2-style accumulator.
const HASH_SEED: i32 = 5381;

/// Inputs shorter than this are repeated until they reach it.
const MIN_HASH_INPUT_LEN: usize = 8;

/// Map a trace id to a value in `[0, 100]`.
///
/// Must stay bit-compatible with the other SDKs: characters are UTF-16 code
/// units and every step wraps at 32 bits.
pub fn sampling_hash(input: &str) -> f64 {
    if input.is_empty() {
        return 0.0;
    }

    let mut units: Vec<u16> = input.encode_utf16().collect();
    while units.len() < MIN_HASH_INPUT_LEN {
        units.extend_from_within(..);
    }

    let mut hash = HASH_SEED;
    for unit in units {
        hash = hash
            .wrapping_shl(5)
            .wrapping_add(hash)
            .wrapping_add(i32::from(unit));
    }

    // abs(i32::MIN) does not fit.
    let hash = if hash == i32::MIN { i32::MAX } else { hash.abs() };
    f64::from(hash) / f64::from(i32::MAX) * 100.0
}

/// Decide whether an envelope is kept. The envelope carries the configured sample rate.
pub fn should_sample(envelope: &Envelope, correlation: Option<&CorrelationContext>) -> bool {
    should_sample_with_rng(envelope, correlation, &mut rand::thread_rng())
}

/// Same as [`should_sample`] with an explicit source for the per-item random draw.
pub fn should_sample_with_rng<R>(
    envelope: &Envelope,
    correlation: Option<&CorrelationContext>,
    rng: &mut R,
) -> bool
where
    R: Rng + ?Sized,
{
    let sample_rate = match envelope.sample_rate {
        Some(rate) if rate < 100.0 => rate,
        _ => return true,
    };

    // Metrics feed aggregates; dropping any skews them.
    if envelope.kind() == Some(TelemetryKind::Metric) {
        return true;
    }

    let keep = match correlation {
        Some(ctx) => ctx.is_sampled() && sampling_hash(&ctx.trace_id) < sample_rate,
        None => rng.gen::<f64>() * 100.0 < sample_rate,
    };

    if !keep {
        debug!(
            envelope = %envelope.name,
            sample_rate,
            correlated = correlation.is_some(),
            "telemetry item sampled out"
        );
    }
    keep
}
