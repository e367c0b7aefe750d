//! Property-based tests for envelope construction

use std::collections::BTreeMap;

use beacon::config::ClientConfig;
use beacon::context::CorrelationContext;
use beacon::contracts::{tags, EventTelemetry, TelemetryItem, TelemetryKind};
use beacon::envelope::{create_envelope, envelope_name, ms_to_time_span, parse_stack};
use proptest::prelude::*;

fn parse_time_span(span: &str) -> f64 {
    let (days, clock) = match span.split_once('.') {
        Some((days, rest)) if !days.contains(':') => (days.parse::<f64>().unwrap(), rest),
        _ => (0.0, span),
    };
    let parts: Vec<&str> = clock.split(':').collect();
    let hours: f64 = parts[0].parse().unwrap();
    let minutes: f64 = parts[1].parse().unwrap();
    let seconds: f64 = parts[2].parse().unwrap();
    ((days * 24.0 + hours) * 60.0 + minutes) * 60_000.0 + seconds * 1_000.0
}

proptest! {
    /// Envelope names never contain dashes from the key and end with the type name
    #[test]
    fn envelope_name_strips_dashes(key in "[a-f0-9-]{0,40}") {
        let name = envelope_name(&key, TelemetryKind::Event);
        let expected = format!("Microsoft.ApplicationInsights.{}.Event", key.replace('-', ""));
        prop_assert!(!name.contains('-'));
        prop_assert_eq!(name, expected);
    }

    /// Item properties win over common properties; both sets are present
    #[test]
    fn item_properties_override_common(
        common in proptest::collection::btree_map("[a-z]{1,4}", "[a-z]{0,6}", 0..6),
        own in proptest::collection::btree_map("[a-z]{1,4}", "[A-Z]{0,6}", 0..6),
    ) {
        let item = TelemetryItem::new(EventTelemetry::new("e")).with_properties(own.clone());
        let envelope = create_envelope(&item, Some(&common), None, None, None);
        let merged = envelope.data.base_data.properties();

        let mut expected: BTreeMap<String, String> = common.clone();
        expected.extend(own);
        prop_assert_eq!(merged, &expected);
    }

    /// The configured rate is clamped into [0, 100]
    #[test]
    fn sample_rate_is_clamped(rate in -1_000.0f64..1_000.0) {
        let mut config = ClientConfig::new("ikey");
        config.sampling_percentage = rate;
        let envelope = create_envelope(
            &TelemetryItem::new(EventTelemetry::new("e")),
            None,
            None,
            None,
            Some(&config),
        );
        let stamped = envelope.sample_rate.unwrap();
        prop_assert!((0.0..=100.0).contains(&stamped));
        prop_assert_eq!(stamped, rate.clamp(0.0, 100.0));
    }

    /// Explicit operation tags are never replaced by correlation values
    #[test]
    fn explicit_operation_id_wins(
        explicit in "[a-z0-9]{1,16}",
        trace_id in "[0-9a-f]{32}",
    ) {
        let item = TelemetryItem::new(EventTelemetry::new("e"))
            .with_tag_override(tags::OPERATION_ID, explicit.clone());
        let correlation = CorrelationContext::new(trace_id, CorrelationContext::SAMPLED_FLAG);
        let envelope = create_envelope(&item, None, None, Some(&correlation), None);
        prop_assert_eq!(&envelope.tags[tags::OPERATION_ID], &explicit);
    }

    /// Whole-millisecond durations render back to the same value
    #[test]
    fn time_span_reads_back(ms in 0u64..(10 * 86_400_000)) {
        let span = ms_to_time_span(ms as f64);
        prop_assert!((parse_time_span(&span) - ms as f64).abs() < 0.5, "{span}");
    }

    /// Parsing arbitrary text never yields frames with empty method or file
    #[test]
    fn parsed_frames_are_never_blank(text in "[ a-z:()@0-9/.\n]{0,200}") {
        for (index, frame) in parse_stack(&text).iter().enumerate() {
            prop_assert_eq!(frame.level, index);
            prop_assert!(!frame.method.is_empty());
            prop_assert!(!frame.file_name.is_empty());
        }
    }
}
