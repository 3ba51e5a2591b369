pub mod alpha_router;
pub mod factory;
pub mod http;
pub mod oneinch;
pub mod traits;
pub mod zeroex;

// Re-exports
pub use alpha_router::{AlphaRouterAdapter, UpstreamComparison};
pub use factory::AdapterRegistry;
pub use oneinch::OneInchAdapter;
pub use traits::{AdapterConfig, AdapterError, SwapAdapter};
pub use zeroex::ZeroExAdapter;
