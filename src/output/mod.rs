//! Output module
//!
//! Writes the tap's message stream: one JSON document per line on stdout.
//!
//! # Overview
//!
//! This module provides:
//! - `Message` - SCHEMA, RECORD and STATE messages
//! - `MessageSink` - where messages go
//! - `JsonLinesSink` - newline-delimited JSON over any `Write`
//! - `MemorySink` - collects messages in memory

mod message;
mod writer;

pub use message::Message;
pub use writer::{JsonLinesSink, MemorySink, MessageSink};

#[cfg(test)]
mod tests;
