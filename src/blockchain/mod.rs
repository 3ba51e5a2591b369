pub mod abi;
pub mod rpc;

pub use abi::{encode_alpha_swap, encode_approve, IAlphaRouter, IERC20};
pub use rpc::BlockchainClient;
