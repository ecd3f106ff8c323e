//! Sink implementations

pub mod console;
pub mod fan_out;
pub mod memory;
pub mod rotating_file;
pub mod serializing;

pub use console::{ConsoleSink, ConsoleStream};
pub use fan_out::FanOutSink;
pub use memory::{DiscardSink, MemorySink};
pub use rotating_file::{RotatingFileSink, RotatingFileSinkBuilder, RotationPolicy};
pub use serializing::SerializingSink;
