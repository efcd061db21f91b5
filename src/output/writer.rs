//! Message sinks

use super::message::Message;
use crate::error::Result;
use crate::types::JsonValue;
use std::io::Write;

/// Destination for tap messages
pub trait MessageSink {
    /// Write one message
    fn write_message(&mut self, message: &Message) -> Result<()>;

    /// Flush anything buffered
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes each message as one line of JSON
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink over any writer
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of messages written so far
    pub fn messages_written(&self) -> usize {
        self.written
    }

    /// Consume the sink and return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for JsonLinesSink<W> {
    fn write_message(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;

        // Checkpoints must reach the consumer before more records do
        if matches!(message, Message::State { .. }) {
            self.writer.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every message in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    messages: Vec<Message>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Record payloads for a stream
    pub fn records(&self, stream: &str) -> Vec<&JsonValue> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Values of every STATE message
    pub fn states(&self) -> Vec<&JsonValue> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Value of the last STATE message
    pub fn last_state(&self) -> Option<&JsonValue> {
        self.states().last().copied()
    }

    /// Number of SCHEMA messages for a stream
    pub fn schema_count(&self, stream: &str) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::Schema { stream: s, .. } if s == stream))
            .count()
    }
}

impl MessageSink for MemorySink {
    fn write_message(&mut self, message: &Message) -> Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn write_message(&mut self, message: &Message) -> Result<()> {
        (**self).write_message(message)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
