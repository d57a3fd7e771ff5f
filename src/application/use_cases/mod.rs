mod stream_query;

pub use stream_query::*;
