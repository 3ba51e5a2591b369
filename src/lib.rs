// Alpha Swap Aggregator Library

pub mod adapters;
pub mod aggregator;
pub mod blockchain;
pub mod common;
pub mod config;
pub mod constants;
pub mod execution;
pub mod mocks;
pub mod types;

// Re-exports for convenience
pub use adapters::{AdapterError, AdapterRegistry, SwapAdapter};
pub use aggregator::{AggregatedQuotes, AggregatorError, PreparedSwap, QuoteAggregator};
pub use config::Config;
pub use execution::{ExecutionDispatcher, ExecutionPlanner, TransactionBuilder};
pub use types::*;
