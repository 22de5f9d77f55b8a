//! Concrete reader and publisher drivers for the binary.

mod line_reader;
mod publisher;

pub use line_reader::LineReader;
pub use publisher::AnyPublisher;
