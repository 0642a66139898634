use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider, UpDownCounter},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    frames_counter: Counter<u64>,
    pipeline_duration: Histogram<u64>,
    active_sessions: UpDownCounter<i64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("sign_stream");
        global::set_meter_provider(provider);

        let frames_counter = meter
            .u64_counter("frames_total")
            .with_description("Total number of frames answered, by outcome")
            .build();

        let boundaries = generate_boundaries((5, 25, 60, 500, 1000));

        let pipeline_duration = meter
            .u64_histogram("pipeline_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of the offloaded frame pipeline in milliseconds")
            .build();

        let active_sessions = meter
            .i64_up_down_counter("active_sessions")
            .with_description("Number of open streaming sessions")
            .build();

        Ok(Metrics {
            frames_counter,
            pipeline_duration,
            active_sessions,
            registry,
        })
    }

    pub fn record_frame(&self, outcome: &str) {
        let attributes = [KeyValue::new("outcome", outcome.to_string())];
        self.frames_counter.add(1, &attributes);
    }

    pub fn record_pipeline_duration(&self, duration_ms: u64, outcome: &str) {
        let attributes = [KeyValue::new("outcome", outcome.to_string())];
        self.pipeline_duration.record(duration_ms, &attributes);
    }

    pub fn session_opened(&self) {
        self.active_sessions.add(1, &[]);
    }

    pub fn session_closed(&self) {
        self.active_sessions.add(-1, &[]);
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 5;
    let middle_step: usize = 5;
    let end_step: usize = 20;
    let tail_step: usize = 100;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
