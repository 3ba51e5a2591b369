use alloy::primitives::{address, Address};

// Native asset sentinel used by wallets and the UI
pub const NATIVE_TOKEN: Address = Address::ZERO;

// Native asset placeholder accepted by 0x and 1inch
pub const NATIVE_PLACEHOLDER: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

// Wrapped native tokens
pub const WETH_ETHEREUM: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
pub const WETH_OPTIMISM: Address = address!("4200000000000000000000000000000000000006");
pub const WETH_ARBITRUM: Address = address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1");

// Common tokens (Base)
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

// Provider approval targets
pub const ONEINCH_ROUTER_V6: Address = address!("111111125421cA6dc452d289314280a0f8842A65");
pub const ZEROEX_ALLOWANCE_HOLDER: Address = address!("0000000000001fF3684f28c67538d4D072C22734");
// Alpha Router has no deployed router yet; the address comes from config.
pub const ALPHA_ROUTER_CONTRACT: Address = Address::ZERO;

// Provider endpoints
pub const ALPHA_ROUTER_API_URL: &str = "https://alpha-router-base-production.up.railway.app";
pub const ZEROEX_API_URL: &str = "https://api.0x.org";
pub const ONEINCH_API_URL: &str = "https://api.1inch.dev";

// Basis points
pub const BPS_DENOMINATOR: u64 = 10_000;
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50; // 0.5%

// Gas
pub const DEFAULT_SWAP_GAS: u64 = 150_000;
pub const DEFAULT_APPROVAL_GAS: u64 = 60_000;
pub const GAS_MULTIPLIER_NUMERATOR: u64 = 12;
pub const GAS_MULTIPLIER_DENOMINATOR: u64 = 10;
pub const GAS_BUFFER: u64 = 86_000;

// Timeouts (ms)
pub const DEFAULT_QUOTE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_GAS_SIMULATION_TIMEOUT_MS: u64 = 5_000;

// Largest decimal count whose scale still fits in a U256
pub const MAX_TOKEN_DECIMALS: u8 = 77;
