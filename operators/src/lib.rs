pub mod engine;
pub mod error;
pub mod mock;
pub mod processing;
pub mod source;
pub mod util;
