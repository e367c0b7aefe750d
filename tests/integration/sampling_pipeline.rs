//! Consistent sampling through the client pipeline

use std::sync::Arc;

use beacon::client::{FlushOptions, MemorySink, TelemetryClient};
use beacon::config::ClientConfig;
use beacon::context::CorrelationContext;
use beacon::contracts::{EventTelemetry, MetricTelemetry, TelemetryKind};
use beacon::sampling::sampling_hash;

fn sampled_client(percentage: f64) -> (TelemetryClient, Arc<MemorySink>) {
    let mut config = ClientConfig::new("ikey");
    config.sampling_percentage = percentage;
    let sink = Arc::new(MemorySink::new());
    let client = TelemetryClient::new(config, sink.clone()).unwrap();
    (client, sink)
}

#[test]
fn test_all_items_of_a_trace_share_one_decision() {
    let (client, sink) = sampled_client(50.0);
    let trace_ids = [
        "0af7651916cd43dd8448eb211c80319c",
        "4bf92f3577b34da6a3ce929d0e0e4736",
        "a3ce929d0e0e47364bf92f3577b34da6",
        "b7ad6b7169203331b7ad6b7169203331",
    ];

    for trace_id in trace_ids {
        let correlation = CorrelationContext::new(trace_id, CorrelationContext::SAMPLED_FLAG);
        let expected = sampling_hash(trace_id) < 50.0;
        for step in 0..5 {
            let kept = client.track_correlated(
                EventTelemetry::new(format!("step-{step}")),
                Some(&correlation),
            );
            assert_eq!(kept, expected, "{trace_id}");
        }
    }

    client.flush(FlushOptions::default()).unwrap();
    let kept_traces = trace_ids
        .iter()
        .filter(|id| sampling_hash(id) < 50.0)
        .count();
    assert_eq!(sink.envelopes().len(), kept_traces * 5);
}

#[test]
fn test_sample_rate_is_stamped_on_kept_envelopes() {
    let (client, sink) = sampled_client(50.0);
    let correlation = CorrelationContext::new(
        "4bf92f3577b34da6a3ce929d0e0e4736",
        CorrelationContext::SAMPLED_FLAG,
    );
    assert!(client.track_correlated(EventTelemetry::new("kept"), Some(&correlation)));
    client.flush(FlushOptions::default()).unwrap();
    assert_eq!(sink.envelopes()[0].sample_rate, Some(50.0));
}

#[test]
fn test_metrics_survive_any_rate() {
    let (client, sink) = sampled_client(0.0);
    let unsampled = CorrelationContext::new("0af7651916cd43dd8448eb211c80319c", 0);
    for i in 0..10 {
        assert!(client.track_correlated(MetricTelemetry::new("depth", i as f64), Some(&unsampled)));
        assert!(!client.track(EventTelemetry::new("noise")));
    }
    client.flush(FlushOptions::default()).unwrap();

    let envelopes = sink.envelopes();
    assert_eq!(envelopes.len(), 10);
    assert!(envelopes
        .iter()
        .all(|e| e.kind() == Some(TelemetryKind::Metric)));
}
