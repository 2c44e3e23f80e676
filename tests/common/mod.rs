pub mod strategies;

pub use harness::*;
pub use strategies::*;
