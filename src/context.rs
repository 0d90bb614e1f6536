//! Per-invocation I/O handle passed to a module's `process` call.
//!
//! A [`ProcessingContext`] is created by the worker for one invocation and
//! dropped right after. It carries either a single input message (the common
//! path; empty for sources) or a tag → message map (the fusion path), plus an
//! output buffer. The context tracks *how* the module touched its input; at
//! collection time that mode decides what flows downstream:
//!
//! | mode | trigger | collected output |
//! |---|---|---|
//! | `Unspecified` | nothing touched the input | explicit `add_output` calls |
//! | `BorrowOnly` | `input*` / `payload*` | explicit `add_output` calls |
//! | `TakeAndOutput` | `take_input*` | explicit `add_output` calls |
//! | `ModifyInPlace` | `payload_mut*` | the mutated input itself |

use indexmap::IndexMap;
use std::any::Any;

use crate::error::{PipelineError, Result};
use crate::message::Message;

/// Status a module reports for one `process` invocation.
///
/// Anything other than `Ok` makes the worker skip dispatch for that context
/// and continue with the next one; it never terminates the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Ok,
    Error,
    FailedGetInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextMode {
    Unspecified,
    BorrowOnly,
    TakeAndOutput,
    ModifyInPlace,
}

enum InputSlot {
    /// One message; may be empty when the module is a source.
    Single(Message),
    /// One message per upstream, keyed by source name (fusion).
    Multi(IndexMap<String, Message>),
}

pub struct ProcessingContext {
    input: InputSlot,
    mode: ContextMode,
    outputs: Vec<Message>,
}

impl ProcessingContext {
    /// Context over a single input message. Built by the worker; public so
    /// module implementations can be unit-tested in isolation.
    pub fn single(input: Message) -> Self {
        Self {
            input: InputSlot::Single(input),
            mode: ContextMode::Unspecified,
            outputs: Vec::new(),
        }
    }

    /// Context over a tag → message map (one entry per upstream source).
    pub fn multi(inputs: IndexMap<String, Message>) -> Self {
        Self {
            input: InputSlot::Multi(inputs),
            mode: ContextMode::Unspecified,
            outputs: Vec::new(),
        }
    }

    /// Immutable view of the single input message, if this is a single-input
    /// context.
    pub fn input(&mut self) -> Option<&Message> {
        match &self.input {
            InputSlot::Single(msg) => {
                self.mode = ContextMode::BorrowOnly;
                Some(msg)
            }
            InputSlot::Multi(_) => None,
        }
    }

    /// Immutable view of the input message tagged `tag` (fusion path).
    pub fn input_tagged(&mut self, tag: &str) -> Option<&Message> {
        match &self.input {
            InputSlot::Multi(map) => {
                let msg = map.get(tag)?;
                self.mode = ContextMode::BorrowOnly;
                Some(msg)
            }
            InputSlot::Single(_) => None,
        }
    }

    /// Moves the single input message out of the context.
    pub fn take_input(&mut self) -> Result<Message> {
        match &mut self.input {
            InputSlot::Single(msg) => {
                self.mode = ContextMode::TakeAndOutput;
                Ok(std::mem::take(msg))
            }
            InputSlot::Multi(_) => Err(PipelineError::NotSingleInput),
        }
    }

    /// Moves the input message tagged `tag` out of the context.
    pub fn take_input_tagged(&mut self, tag: &str) -> Result<Message> {
        match &mut self.input {
            InputSlot::Multi(map) => {
                let msg = map
                    .get_mut(tag)
                    .ok_or_else(|| PipelineError::MissingTag(tag.to_string()))?;
                self.mode = ContextMode::TakeAndOutput;
                Ok(std::mem::take(msg))
            }
            InputSlot::Single(_) => Err(PipelineError::NotMultiInput),
        }
    }

    /// Typed immutable access to the single input's payload. `None` on shape
    /// or type mismatch; never copies.
    pub fn payload<T: Any>(&mut self) -> Option<&T> {
        match &self.input {
            InputSlot::Single(msg) => {
                self.mode = ContextMode::BorrowOnly;
                msg.get::<T>()
            }
            InputSlot::Multi(_) => None,
        }
    }

    /// Typed immutable access to the payload tagged `tag`.
    pub fn payload_tagged<T: Any>(&mut self, tag: &str) -> Option<&T> {
        match &self.input {
            InputSlot::Multi(map) => {
                let msg = map.get(tag)?;
                self.mode = ContextMode::BorrowOnly;
                msg.get::<T>()
            }
            InputSlot::Single(_) => None,
        }
    }

    /// Typed mutable access to the single input's payload. Triggers COW on
    /// the underlying message and flips the context into in-place mode, so
    /// the (now private) input becomes this invocation's output.
    pub fn payload_mut<T: Any>(&mut self) -> Option<&mut T> {
        match &mut self.input {
            InputSlot::Single(msg) => {
                let payload = msg.get_mut::<T>();
                if payload.is_some() {
                    self.mode = ContextMode::ModifyInPlace;
                }
                payload
            }
            InputSlot::Multi(_) => None,
        }
    }

    /// Typed mutable access to the payload tagged `tag` (fusion path).
    pub fn payload_mut_tagged<T: Any>(&mut self, tag: &str) -> Option<&mut T> {
        match &mut self.input {
            InputSlot::Multi(map) => {
                let payload = map.get_mut(tag)?.get_mut::<T>();
                if payload.is_some() {
                    self.mode = ContextMode::ModifyInPlace;
                }
                payload
            }
            InputSlot::Single(_) => None,
        }
    }

    /// Appends a message to the output buffer. Ignored at collection time if
    /// the module mutated its input in place.
    pub fn add_output(&mut self, msg: Message) {
        self.outputs.push(msg);
    }

    /// Number of messages currently buffered via [`Self::add_output`].
    pub fn output_len(&self) -> usize {
        self.outputs.len()
    }

    /// Yields the messages to dispatch for this invocation, in order.
    ///
    /// Called by the worker after the module returns; public so module unit
    /// tests can assert on outputs.
    pub fn collect_outputs(&mut self) -> Vec<Message> {
        if self.mode != ContextMode::ModifyInPlace {
            return std::mem::take(&mut self.outputs);
        }
        match &mut self.input {
            InputSlot::Single(msg) => vec![std::mem::take(msg)],
            InputSlot::Multi(map) => map.values_mut().map(std::mem::take).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_inputs() -> IndexMap<String, Message> {
        let mut map = IndexMap::new();
        map.insert("left".to_string(), Message::with_source(1i64, "left"));
        map.insert("right".to_string(), Message::with_source(2i64, "right"));
        map
    }

    #[test]
    fn test_unspecified_mode_collects_explicit_outputs() {
        let mut ctx = ProcessingContext::single(Message::new(5i64));
        ctx.add_output(Message::new(10i64));
        ctx.add_output(Message::new(20i64));

        let out = ctx.collect_outputs();
        assert_eq!(out.len(), 2);
        assert_eq!(*out[0].borrow::<i64>().unwrap(), 10);
        assert_eq!(*out[1].borrow::<i64>().unwrap(), 20);
    }

    #[test]
    fn test_borrow_only_mode_collects_explicit_outputs() {
        let mut ctx = ProcessingContext::single(Message::new(5i64));
        assert_eq!(*ctx.payload::<i64>().unwrap(), 5);
        ctx.add_output(Message::new(6i64));

        let out = ctx.collect_outputs();
        assert_eq!(out.len(), 1);
        assert_eq!(*out[0].borrow::<i64>().unwrap(), 6);
    }

    #[test]
    fn test_take_mode_collects_explicit_outputs() {
        let mut ctx = ProcessingContext::single(Message::new(5i64));
        let taken = ctx.take_input().unwrap();
        ctx.add_output(taken);

        let out = ctx.collect_outputs();
        assert_eq!(out.len(), 1);
        assert_eq!(*out[0].borrow::<i64>().unwrap(), 5);
    }

    #[test]
    fn test_modify_in_place_overrides_explicit_outputs() {
        let mut ctx = ProcessingContext::single(Message::new(5i64));
        *ctx.payload_mut::<i64>().unwrap() = 50;
        // Explicit outputs are ignored in this mode.
        ctx.add_output(Message::new(999i64));

        let out = ctx.collect_outputs();
        assert_eq!(out.len(), 1);
        assert_eq!(*out[0].borrow::<i64>().unwrap(), 50);
    }

    #[test]
    fn test_shape_mismatch_errors() {
        let mut single = ProcessingContext::single(Message::new(1i64));
        assert!(matches!(
            single.take_input_tagged("x"),
            Err(PipelineError::NotMultiInput)
        ));
        assert!(single.input_tagged("x").is_none());
        assert!(single.payload_tagged::<i64>("x").is_none());

        let mut multi = ProcessingContext::multi(tagged_inputs());
        assert!(matches!(
            multi.take_input(),
            Err(PipelineError::NotSingleInput)
        ));
        assert!(multi.input().is_none());
        assert!(multi.payload::<i64>().is_none());
        assert!(matches!(
            multi.take_input_tagged("missing"),
            Err(PipelineError::MissingTag(_))
        ));
    }

    #[test]
    fn test_tagged_access() {
        let mut ctx = ProcessingContext::multi(tagged_inputs());
        assert_eq!(*ctx.payload_tagged::<i64>("left").unwrap(), 1);
        assert_eq!(*ctx.payload_tagged::<i64>("right").unwrap(), 2);
        assert_eq!(ctx.input_tagged("left").unwrap().meta().source_name, "left");

        let taken = ctx.take_input_tagged("right").unwrap();
        assert_eq!(*taken.borrow::<i64>().unwrap(), 2);
    }

    #[test]
    fn test_multi_modify_in_place_collects_all_inputs() {
        let mut ctx = ProcessingContext::multi(tagged_inputs());
        *ctx.payload_mut_tagged::<i64>("left").unwrap() = 11;

        let out = ctx.collect_outputs();
        assert_eq!(out.len(), 2);
        assert_eq!(*out[0].borrow::<i64>().unwrap(), 11);
        assert_eq!(*out[1].borrow::<i64>().unwrap(), 2);
    }

    #[test]
    fn test_payload_type_mismatch_is_none() {
        let mut ctx = ProcessingContext::single(Message::new(1i64));
        assert!(ctx.payload::<String>().is_none());
        assert!(ctx.payload_mut::<String>().is_none());
        // A failed mutable access must not flip the mode.
        ctx.add_output(Message::new(2i64));
        assert_eq!(ctx.collect_outputs().len(), 1);
    }

    #[test]
    fn test_source_context_has_empty_input() {
        let mut ctx = ProcessingContext::single(Message::empty());
        assert!(!ctx.input().unwrap().has_payload());
        assert!(ctx.payload::<i64>().is_none());
    }
}
