//! End-to-end pipeline scenarios: linear flow, fan-out/fan-in, COW isolation
//! across parallel sinks, and shutdown behavior under load.

mod common;

use common::{collect_n, drain_extra};
use crossbeam_channel::Sender;
use flowline::modules::{CollectSink, InjectSource, PassThrough, TickSource};
use flowline::{
    Config, Message, Module, PipelineBuilder, ProcessStatus, ProcessingContext,
};
use std::time::{Duration, Instant};

const COLLECT_TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn test_linear_pipeline_delivers_all_messages_in_order() {
    let (source, feed) = InjectSource::new("A");
    let (sink, collected) = CollectSink::new("C");

    let mut pipeline = PipelineBuilder::new("linear")
        .add_module(Box::new(source))
        .add_module(Box::new(PassThrough::new("B")))
        .add_module(Box::new(sink))
        .connect("A", "B")
        .connect("B", "C")
        .channel_capacity(256)
        .build()
        .unwrap();

    pipeline.init().unwrap();
    pipeline.start().unwrap();

    for i in 0..100u64 {
        feed.send(Message::with_source(i, "A")).unwrap();
    }

    let received = collect_n(&collected, 100, COLLECT_TIMEOUT);
    for (i, msg) in received.iter().enumerate() {
        assert_eq!(*msg.borrow::<u64>().unwrap(), i as u64, "FIFO order broken");
        assert_eq!(msg.meta().source_name, "B");
    }
    assert_eq!(drain_extra(&collected, Duration::from_millis(200)), 0);

    pipeline.stop().unwrap();
    pipeline.deinit().unwrap();
    assert!(!pipeline.is_running());
}

#[test]
fn test_fan_out_fan_in_without_fusion_doubles_delivery() {
    let (source, feed) = InjectSource::new("A");
    let (sink, collected) = CollectSink::new("D");

    let mut pipeline = PipelineBuilder::new("diamond")
        .add_module(Box::new(source))
        .add_module(Box::new(PassThrough::new("B")))
        .add_module(Box::new(PassThrough::new("C")))
        .add_module(Box::new(sink))
        .connect("A", "B")
        .connect("A", "C")
        .connect("B", "D")
        .connect("C", "D")
        .channel_capacity(256)
        .build()
        .unwrap();

    pipeline.init().unwrap();
    pipeline.start().unwrap();

    for i in 0..100u64 {
        feed.send(Message::with_source(i, "A")).unwrap();
    }

    // Each of A's messages travels through both branches.
    let received = collect_n(&collected, 200, COLLECT_TIMEOUT);
    let from_b = received
        .iter()
        .filter(|m| m.meta().source_name == "B")
        .count();
    let from_c = received
        .iter()
        .filter(|m| m.meta().source_name == "C")
        .count();
    assert_eq!(from_b, 100);
    assert_eq!(from_c, 100);

    pipeline.stop().unwrap();
    pipeline.deinit().unwrap();
}

/// Sink that mutates its copy of the payload in place and reports the value
/// it observed afterwards.
struct MutateSink {
    name: String,
    seen: Sender<String>,
}

impl Module for MutateSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus {
        let Some(payload) = ctx.payload_mut::<String>() else {
            return ProcessStatus::FailedGetInput;
        };
        payload.push_str(" [mutated]");
        let _ = self.seen.send(payload.clone());
        ProcessStatus::Ok
    }
}

#[test]
fn test_cow_isolates_sinks_under_fan_out() {
    let (source, feed) = InjectSource::new("A");
    let (observer, observed) = CollectSink::new("S2");
    let (mutated_tx, mutated_rx) = crossbeam_channel::unbounded();

    let mut pipeline = PipelineBuilder::new("cow")
        .add_module(Box::new(source))
        .add_module(Box::new(MutateSink {
            name: "S1".to_string(),
            seen: mutated_tx,
        }))
        .add_module(Box::new(observer))
        .connect("A", "S1")
        .connect("A", "S2")
        .channel_capacity(256)
        .build()
        .unwrap();

    pipeline.init().unwrap();
    pipeline.start().unwrap();

    for i in 0..50u64 {
        feed.send(Message::with_source(format!("payload-{i}"), "A"))
            .unwrap();
    }

    // S2 observes the original payloads no matter when S1 mutates its copy.
    let originals = collect_n(&observed, 50, COLLECT_TIMEOUT);
    for msg in &originals {
        let payload = msg.borrow::<String>().unwrap();
        assert!(payload.starts_with("payload-"), "payload was '{payload}'");
        assert!(!payload.contains("[mutated]"));
    }

    // And S1 saw every message with its private mutation applied.
    for _ in 0..50 {
        let seen = mutated_rx.recv_timeout(COLLECT_TIMEOUT).unwrap();
        assert!(seen.ends_with(" [mutated]"));
    }

    pipeline.stop().unwrap();
    pipeline.deinit().unwrap();
}

/// Sink slow enough that a fast producer keeps every queue full.
struct SlowSink {
    name: String,
}

impl Module for SlowSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus {
        let _ = ctx.input();
        std::thread::sleep(Duration::from_millis(50));
        ProcessStatus::Ok
    }
}

#[test]
fn test_stop_is_prompt_under_backpressure() {
    let mut pipeline = PipelineBuilder::new("pressure")
        .add_module_with_config(
            Box::new(TickSource::new("fast")),
            Config::new().with("intervalMs", 0i64),
        )
        .add_module(Box::new(SlowSink {
            name: "slow".to_string(),
        }))
        .connect("fast", "slow")
        .channel_capacity(2)
        .build()
        .unwrap();

    pipeline.init().unwrap();
    pipeline.start().unwrap();
    std::thread::sleep(Duration::from_millis(300));

    let start = Instant::now();
    pipeline.stop().unwrap();
    // Bounded by the batch window plus one in-flight process call.
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "stop took {:?}",
        start.elapsed()
    );
    assert!(!pipeline.is_running());

    pipeline.deinit().unwrap();
}

#[test]
fn test_source_actor_stops_within_poll_interval() {
    let mut pipeline = PipelineBuilder::new("source-stop")
        .add_module_with_config(
            Box::new(TickSource::new("ticker")),
            Config::new().with("intervalMs", 5i64),
        )
        .add_module(Box::new(PassThrough::new("relay")))
        .connect("ticker", "relay")
        .build()
        .unwrap();

    pipeline.init().unwrap();
    pipeline.start().unwrap();
    std::thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    pipeline.stop().unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
}
