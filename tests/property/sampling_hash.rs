//! Property-based tests for the sampling hash and sampling decisions

use beacon::config::ClientConfig;
use beacon::context::CorrelationContext;
use beacon::contracts::{EventTelemetry, MetricTelemetry, TelemetryItem};
use beacon::envelope::create_envelope;
use beacon::sampling::{sampling_hash, should_sample};
use proptest::prelude::*;

/// Hash output always lies in [0, 100]
#[test]
fn test_hash_range_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<String>(), |input| {
            let score = sampling_hash(&input);
            prop_assert!((0.0..=100.0).contains(&score), "{score}");
            prop_assert_eq!(score, sampling_hash(&input));
            Ok(())
        })
        .unwrap();
}

proptest! {
    /// Short inputs are padded by self-repetition, so doubling them changes nothing
    #[test]
    fn short_input_equals_its_doubling(input in "[a-f0-9]{1,7}") {
        let doubled = format!("{input}{input}");
        prop_assert_eq!(sampling_hash(&input), sampling_hash(&doubled));
    }

    /// A correlated item kept at rate r is kept at every higher rate
    #[test]
    fn correlated_decision_is_monotonic_in_rate(
        trace_id in "[0-9a-f]{32}",
        low in 0.0f64..100.0,
        delta in 0.0f64..100.0,
    ) {
        let high = (low + delta).min(100.0);
        let correlation = CorrelationContext::new(trace_id, CorrelationContext::SAMPLED_FLAG);
        let item = TelemetryItem::new(EventTelemetry::new("e"));

        let decide = |rate: f64| {
            let mut config = ClientConfig::new("ikey");
            config.sampling_percentage = rate;
            let envelope = create_envelope(&item, None, None, Some(&correlation), Some(&config));
            should_sample(&envelope, Some(&correlation))
        };

        if decide(low) {
            prop_assert!(decide(high));
        }
    }

    /// Metrics are never sampled out, whatever the rate or trace flags
    #[test]
    fn metrics_are_always_kept(
        trace_id in "[0-9a-f]{32}",
        flags in any::<u8>(),
        rate in 0.0f64..=100.0,
    ) {
        let mut config = ClientConfig::new("ikey");
        config.sampling_percentage = rate;
        let correlation = CorrelationContext::new(trace_id, flags);
        let envelope = create_envelope(
            &TelemetryItem::new(MetricTelemetry::new("m", 1.0)),
            None,
            None,
            Some(&correlation),
            Some(&config),
        );
        prop_assert!(should_sample(&envelope, Some(&correlation)));
        prop_assert!(should_sample(&envelope, None));
    }
}
