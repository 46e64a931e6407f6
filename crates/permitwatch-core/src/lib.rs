pub mod aggregate;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod normalize;
pub mod outputs;
pub mod pipeline;
pub mod retry;
pub mod source;
pub mod types;
pub mod units;
