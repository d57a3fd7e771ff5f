mod fragment;
mod query_state;
mod translation;

pub use fragment::*;
pub use query_state::*;
pub use translation::*;
