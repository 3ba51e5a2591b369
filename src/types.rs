use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::formatting::{opt_u256_dec, u256_dec};
use crate::constants::*;

/// Supported chains
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Base,
    Arbitrum,
    Optimism,
}

impl Chain {
    pub const ALL: [Chain; 4] = [Chain::Ethereum, Chain::Base, Chain::Arbitrum, Chain::Optimism];

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Base => 8453,
            Chain::Arbitrum => 42161,
            Chain::Optimism => 10,
        }
    }

    /// Canonical wrapped native token for this chain
    pub fn wrapped_native(&self) -> Address {
        match self {
            Chain::Ethereum => WETH_ETHEREUM,
            Chain::Base => WETH_BASE,
            Chain::Arbitrum => WETH_ARBITRUM,
            Chain::Optimism => WETH_OPTIMISM,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ethereum" | "mainnet" => Ok(Chain::Ethereum),
            "base" => Ok(Chain::Base),
            "arbitrum" => Ok(Chain::Arbitrum),
            "optimism" => Ok(Chain::Optimism),
            other => Err(format!("unknown chain: {}", other)),
        }
    }
}

/// A single user swap request, base units throughout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapRequest {
    pub chain: Chain,
    pub from_token: Address,
    pub to_token: Address,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    pub user_address: Option<Address>,
    pub slippage_tolerance_bps: u32,
}

impl SwapRequest {
    pub fn new(chain: Chain, from_token: Address, to_token: Address, amount_in: U256) -> Self {
        Self {
            chain,
            from_token,
            to_token,
            amount_in,
            user_address: None,
            slippage_tolerance_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }

    pub fn with_user(mut self, user: Address) -> Self {
        self.user_address = Some(user);
        self
    }

    pub fn with_slippage_bps(mut self, bps: u32) -> Self {
        self.slippage_tolerance_bps = bps;
        self
    }

    pub fn quote_options(&self) -> QuoteOptions {
        QuoteOptions {
            user_address: self.user_address,
            slippage_bps: Some(self.slippage_tolerance_bps),
        }
    }
}

/// Extra per-quote inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteOptions {
    pub user_address: Option<Address>,
    pub slippage_bps: Option<u32>,
}

impl QuoteOptions {
    /// User address usable as a transaction sender (the native sentinel is not)
    pub fn recipient(&self) -> Option<Address> {
        self.user_address.filter(|addr| *addr != NATIVE_TOKEN)
    }
}

/// One hop within a route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStep {
    pub source_venue: String,
    pub pool_identifier: String,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    pub gas_estimate: u64,
    pub price_impact_bps: u32,
    pub path: Vec<Address>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VenueFee {
    pub venue: String,
    pub amount: String,
    pub percent: f64,
}

/// Fees as reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeeBreakdown {
    pub venue_fees: Vec<VenueFee>,
    pub total_venue_fees: Option<String>,
    pub gas_cost: Option<String>,
    pub gas_cost_usd: Option<f64>,
    pub platform_fee: Option<String>,
    pub platform_fee_percent: Option<f64>,
}

/// Route shape summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingInfo {
    pub is_split: bool,
    pub hops: u32,
    pub complexity: String,
    pub best_source: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PriceImpactSeverity {
    Low,
    Medium,
    High,
}

impl PriceImpactSeverity {
    pub fn from_bps(bps: u32) -> Self {
        match bps {
            0..=100 => PriceImpactSeverity::Low,
            101..=500 => PriceImpactSeverity::Medium,
            _ => PriceImpactSeverity::High,
        }
    }
}

/// Taker and slippage a provider encoded into the calldata it returned
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalldataBinding {
    pub taker: Address,
    pub slippage_bps: u32,
}

/// Provider-agnostic quote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedQuote {
    pub provider_name: String,
    pub chain: Chain,
    /// Tokens as the user asked for them (native sentinel preserved)
    pub token_in: Address,
    pub token_out: Address,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    pub route: Vec<RouteStep>,
    pub total_gas_estimate: u64,
    pub fee_breakdown: FeeBreakdown,
    pub price_impact_bps: u32,
    pub execution_time_ms: u64,
    pub approval_target: Address,
    pub routing: Option<RoutingInfo>,
    /// Ready transaction, only when the quote was fetched with a user address
    pub transaction: Option<SwapTransaction>,
    /// Set when `raw_payload` carries provider calldata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calldata_binding: Option<CalldataBinding>,
    pub quoted_at: DateTime<Utc>,
    #[serde(skip_serializing, default)]
    pub raw_payload: serde_json::Value,
}

impl NormalizedQuote {
    pub fn price_impact_severity(&self) -> PriceImpactSeverity {
        PriceImpactSeverity::from_bps(self.price_impact_bps)
    }

    pub fn is_native_in(&self) -> bool {
        self.token_in == NATIVE_TOKEN
    }
}

/// Sum of per-hop gas estimates
pub fn route_gas(route: &[RouteStep]) -> u64 {
    route.iter().fold(0u64, |total, step| total.saturating_add(step.gas_estimate))
}

/// One row of the comparison table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonEntry {
    pub provider_name: String,
    #[serde(with = "opt_u256_dec")]
    pub amount_out: Option<U256>,
    #[serde(with = "opt_u256_dec")]
    pub delta_from_best: Option<U256>,
    pub delta_percent: Option<Decimal>,
    pub available: bool,
    pub unavailable_reason: Option<String>,
}

impl ComparisonEntry {
    pub fn available(provider_name: &str, amount_out: U256, delta_from_best: U256, delta_percent: Decimal) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            amount_out: Some(amount_out),
            delta_from_best: Some(delta_from_best),
            delta_percent: Some(delta_percent),
            available: true,
            unavailable_reason: None,
        }
    }

    pub fn unavailable(provider_name: &str, reason: String) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            amount_out: None,
            delta_from_best: None,
            delta_percent: None,
            available: false,
            unavailable_reason: Some(reason),
        }
    }
}

/// Best vs runner-up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteSummary {
    pub best_provider: String,
    pub runner_up: String,
    #[serde(with = "u256_dec")]
    pub savings: U256,
    pub savings_percent: Decimal,
}

/// Executable swap transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwapTransaction {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    #[serde(with = "u256_dec")]
    pub value: U256,
    pub gas_limit: u64,
    #[serde(with = "u256_dec")]
    pub minimum_amount_out: U256,
}

/// Generic transaction request handed to the submission collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    #[serde(with = "u256_dec")]
    pub value: U256,
    pub gas_limit: Option<u64>,
}

impl From<&SwapTransaction> for TxRequest {
    fn from(tx: &SwapTransaction) -> Self {
        Self {
            from: tx.from,
            to: tx.to,
            data: tx.data.clone(),
            value: tx.value,
            gas_limit: Some(tx.gas_limit),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StepKind {
    Approval,
    Swap,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Approval => write!(f, "approval"),
            StepKind::Swap => write!(f, "swap"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanStep {
    pub kind: StepKind,
    pub request: TxRequest,
}

/// Ordered transactions to submit; approval (if any) always precedes the swap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPlan {
    pub id: Uuid,
    pub chain: Chain,
    steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn new(chain: Chain, approval: Option<TxRequest>, swap: TxRequest) -> Self {
        let mut steps = Vec::with_capacity(2);
        if let Some(request) = approval {
            steps.push(PlanStep { kind: StepKind::Approval, request });
        }
        steps.push(PlanStep { kind: StepKind::Swap, request: swap });
        Self { id: Uuid::new_v4(), chain, steps }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn requires_approval(&self) -> bool {
        self.steps.iter().any(|s| s.kind == StepKind::Approval)
    }

    /// The swap is always the final step
    pub fn swap_step(&self) -> Option<&PlanStep> {
        self.steps.last().filter(|s| s.kind == StepKind::Swap)
    }

    /// Replace the gas limit of the final step only
    pub fn set_final_gas_limit(&mut self, gas_limit: u64) {
        if let Some(last) = self.steps.last_mut() {
            last.request.gas_limit = Some(gas_limit);
        }
    }
}

/// Dispatcher state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionState {
    Planned,
    ApprovalPending,
    SwapPending,
    Submitted,
    Failed,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionState::Planned => "PLANNED",
            ExecutionState::ApprovalPending => "APPROVAL_PENDING",
            ExecutionState::SwapPending => "SWAP_PENDING",
            ExecutionState::Submitted => "SUBMITTED",
            ExecutionState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(gas: u64) -> RouteStep {
        RouteStep {
            source_venue: "aerodrome".to_string(),
            pool_identifier: "0xpool".to_string(),
            amount_out: U256::from(1u64),
            gas_estimate: gas,
            price_impact_bps: 0,
            path: vec![WETH_BASE, USDC_BASE],
        }
    }

    #[test]
    fn test_chain_parsing() {
        assert_eq!("Base".parse::<Chain>().unwrap(), Chain::Base);
        assert_eq!("mainnet".parse::<Chain>().unwrap(), Chain::Ethereum);
        assert!("solana".parse::<Chain>().is_err());
        assert_eq!(Chain::Base.chain_id(), 8453);
        assert_eq!(Chain::Base.wrapped_native(), WETH_BASE);
    }

    #[test]
    fn test_route_gas_sums_steps() {
        assert_eq!(route_gas(&[step(120_000), step(90_000)]), 210_000);
        assert_eq!(route_gas(&[]), 0);
    }

    #[test]
    fn test_price_impact_severity() {
        assert_eq!(PriceImpactSeverity::from_bps(50), PriceImpactSeverity::Low);
        assert_eq!(PriceImpactSeverity::from_bps(250), PriceImpactSeverity::Medium);
        assert_eq!(PriceImpactSeverity::from_bps(900), PriceImpactSeverity::High);
    }

    #[test]
    fn test_plan_orders_approval_first() {
        let req = TxRequest {
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            data: Bytes::new(),
            value: U256::ZERO,
            gas_limit: Some(60_000),
        };
        let mut plan = ExecutionPlan::new(Chain::Base, Some(req.clone()), req.clone());
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[0].kind, StepKind::Approval);
        assert_eq!(plan.swap_step().unwrap().kind, StepKind::Swap);

        plan.set_final_gas_limit(300_000);
        assert_eq!(plan.steps()[0].request.gas_limit, Some(60_000));
        assert_eq!(plan.swap_step().unwrap().request.gas_limit, Some(300_000));
    }

    #[test]
    fn test_comparison_entry_serializes_decimal_strings() {
        let entry = ComparisonEntry::available("0x", U256::from(2_400_000_000u64), U256::from(100_000_000u64), Decimal::new(4, 2));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["amount_out"], "2400000000");
        assert_eq!(json["delta_from_best"], "100000000");

        let missing = ComparisonEntry::unavailable("1inch", "timeout".to_string());
        let json = serde_json::to_value(&missing).unwrap();
        assert!(json["amount_out"].is_null());
        assert_eq!(json["available"], false);
    }
}
