mod groq_stream_source;
mod mock_stream_source;
pub mod sse;

pub use groq_stream_source::*;
pub use mock_stream_source::*;
