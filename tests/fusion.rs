//! End-to-end synchronized fan-in: tuples grouped by message id, plus
//! eviction of incomplete tuples.

mod common;

use crossbeam_channel::Sender;
use flowline::modules::{InjectSource, PassThrough};
use flowline::{
    Config, Message, Module, PipelineBuilder, ProcessStatus, ProcessingContext,
};
use std::collections::HashSet;
use std::time::Duration;

const COLLECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One processed fusion tuple as seen by the join module.
#[derive(Debug)]
struct Tuple {
    left_id: u64,
    right_id: u64,
    payload: u64,
}

/// Fan-in module joining one message from each of two upstream branches.
struct JoinTwo {
    name: String,
    left: String,
    right: String,
    out: Sender<Tuple>,
}

impl Module for JoinTwo {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus {
        let Ok(left) = ctx.take_input_tagged(&self.left) else {
            return ProcessStatus::FailedGetInput;
        };
        let Ok(right) = ctx.take_input_tagged(&self.right) else {
            return ProcessStatus::FailedGetInput;
        };
        let Ok(payload) = left.borrow::<u64>() else {
            return ProcessStatus::FailedGetInput;
        };
        let tuple = Tuple {
            left_id: left.meta().message_id,
            right_id: right.meta().message_id,
            payload: *payload,
        };
        let _ = self.out.send(tuple);
        ProcessStatus::Ok
    }
}

#[test]
fn test_fusion_joins_matching_message_ids() {
    let (source, feed) = InjectSource::new("A");
    let (tuple_tx, tuple_rx) = crossbeam_channel::unbounded();

    let mut pipeline = PipelineBuilder::new("fusion")
        .add_module(Box::new(source))
        .add_module(Box::new(PassThrough::new("B")))
        .add_module(Box::new(PassThrough::new("C")))
        .add_module_with_config(
            Box::new(JoinTwo {
                name: "D".to_string(),
                left: "B".to_string(),
                right: "C".to_string(),
                out: tuple_tx,
            }),
            Config::new().with("syncInputs", true),
        )
        .connect("A", "B")
        .connect("A", "C")
        .connect("B", "D")
        .connect("C", "D")
        .channel_capacity(256)
        .build()
        .unwrap();

    pipeline.init().unwrap();
    pipeline.start().unwrap();

    let mut sent_ids = HashSet::new();
    for i in 0..100u64 {
        let msg = Message::with_source(i, "A");
        sent_ids.insert(msg.meta().message_id);
        feed.send(msg).unwrap();
    }

    let mut joined_ids = HashSet::new();
    for _ in 0..100 {
        let tuple = tuple_rx.recv_timeout(COLLECT_TIMEOUT).unwrap();
        // Both halves of a tuple descend from the same ancestor message.
        assert_eq!(tuple.left_id, tuple.right_id);
        assert!(sent_ids.contains(&tuple.left_id));
        assert!(joined_ids.insert(tuple.left_id), "tuple processed twice");
        assert!(tuple.payload < 100);
    }
    assert_eq!(joined_ids.len(), 100);
    assert!(tuple_rx
        .recv_timeout(Duration::from_millis(200))
        .is_err());

    pipeline.stop().unwrap();
    pipeline.deinit().unwrap();
}

#[test]
fn test_incomplete_tuple_is_evicted_and_later_tuples_complete() {
    let (left_source, left_feed) = InjectSource::new("L");
    let (right_source, right_feed) = InjectSource::new("R");
    let (tuple_tx, tuple_rx) = crossbeam_channel::unbounded();

    let mut pipeline = PipelineBuilder::new("eviction")
        .add_module(Box::new(left_source))
        .add_module(Box::new(right_source))
        .add_module_with_config(
            Box::new(JoinTwo {
                name: "D".to_string(),
                left: "L".to_string(),
                right: "R".to_string(),
                out: tuple_tx,
            }),
            Config::new()
                .with("syncInputs", true)
                .with("fusionTimeoutMs", 100i64),
        )
        .connect("L", "D")
        .connect("R", "D")
        .build()
        .unwrap();

    pipeline.init().unwrap();
    pipeline.start().unwrap();

    // A lone message on one branch never completes its tuple.
    let orphan = Message::with_source(1u64, "L");
    let orphan_id = orphan.meta().message_id;
    let mut late_sibling = orphan.deep_clone();
    late_sibling.meta_mut().source_name = "R".to_string();
    left_feed.send(orphan).unwrap();

    // Wait past the fusion timeout so the orphan is evicted, then deliver its
    // sibling: the pair must not fuse anymore.
    std::thread::sleep(Duration::from_millis(300));
    assert!(tuple_rx.try_recv().is_err());
    right_feed.send(late_sibling).unwrap();

    // A matching pair still fuses afterwards.
    let left = Message::with_source(2u64, "L");
    let mut right = left.deep_clone();
    right.meta_mut().source_name = "R".to_string();
    let pair_id = left.meta().message_id;
    left_feed.send(left).unwrap();
    right_feed.send(right).unwrap();

    let tuple = tuple_rx.recv_timeout(COLLECT_TIMEOUT).unwrap();
    assert_eq!(tuple.left_id, pair_id);
    assert_eq!(tuple.right_id, pair_id);
    assert_ne!(tuple.left_id, orphan_id);
    // The late sibling found an empty slot, not the evicted orphan.
    assert!(tuple_rx.recv_timeout(Duration::from_millis(200)).is_err());

    pipeline.stop().unwrap();
    pipeline.deinit().unwrap();
}
