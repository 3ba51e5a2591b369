use std::time::Instant;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::http::{bps_to_percent, build_client, parse_leading_u64, send_json, string_or_number};
use super::traits::*;
use crate::common::amounts::parse_base_units;
use crate::common::tokens::upstream_token;
use crate::constants::*;
use crate::execution::transaction_builder::minimum_amount_out;
use crate::types::*;

const NAME: &str = "oneinch";

/// 1inch v6 quote/swap 응답
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OneInchResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    dst_amount: String,
    #[serde(default, deserialize_with = "string_or_number")]
    gas: String,
    /// routes → hops → parts
    #[serde(default)]
    protocols: Vec<Vec<Vec<Protocol>>>,
    tx: Option<TransactionData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Protocol {
    name: String,
    #[serde(default)]
    part: f64,
    from_token_address: String,
    to_token_address: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TransactionData {
    to: String,
    data: String,
    #[serde(default, deserialize_with = "string_or_number")]
    value: String,
    #[serde(default, deserialize_with = "string_or_number")]
    gas: String,
}

/// 1inch 어댑터 (Aggregation API v6)
pub struct OneInchAdapter {
    config: AdapterConfig,
    client: reqwest::Client,
}

impl OneInchAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        let client = build_client(config.timeout());
        Self { config, client }
    }

    fn router(&self) -> Address {
        self.config.router_address.unwrap_or(ONEINCH_ROUTER_V6)
    }

    /// 수신자가 있으면 /swap (tx 포함), 없으면 /quote
    fn request(&self, chain: Chain, from: Address, to: Address, amount_in: U256, options: &QuoteOptions) -> reqwest::RequestBuilder {
        let mut query = vec![
            ("src", format!("{:#x}", upstream_token(chain, from, true))),
            ("dst", format!("{:#x}", upstream_token(chain, to, true))),
            ("amount", amount_in.to_string()),
            ("includeProtocols", "true".to_string()),
            ("includeGas", "true".to_string()),
        ];

        let endpoint = match options.recipient() {
            Some(user) => {
                let slippage = options.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS);
                query.push(("from", format!("{:#x}", user)));
                query.push(("origin", format!("{:#x}", user)));
                query.push(("slippage", bps_to_percent(slippage).to_string()));
                query.push(("disableEstimate", "true".to_string()));
                "swap"
            }
            None => "quote",
        };

        let path = format!("/swap/v6.0/{}/{}", chain.chain_id(), endpoint);
        let mut request = self.client.get(self.config.endpoint(&path)).query(&query);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        request
    }

    fn normalize(
        &self,
        chain: Chain,
        from_token: Address,
        to_token: Address,
        amount_in: U256,
        payload: serde_json::Value,
        started: Instant,
    ) -> Result<NormalizedQuote, AdapterError> {
        let response: OneInchResponse = serde_json::from_value(payload.clone())
            .map_err(|e| AdapterError::unavailable(NAME, format!("malformed response: {}", e)))?;

        let amount_out = parse_base_units(&response.dst_amount)
            .map_err(|e| AdapterError::unavailable(NAME, format!("malformed dstAmount: {}", e)))?;
        if amount_out.is_zero() {
            return Err(AdapterError::unavailable(NAME, "no usable route"));
        }

        // 각 hop에서 비중이 가장 큰 프로토콜을 대표 venue로 사용
        let mut route = Vec::new();
        for hops in &response.protocols {
            for parts in hops {
                let Some(main) = parts.iter().max_by(|a, b| a.part.total_cmp(&b.part)) else {
                    continue;
                };
                route.push(RouteStep {
                    source_venue: main.name.clone(),
                    pool_identifier: main.name.clone(),
                    amount_out: U256::ZERO,
                    gas_estimate: 0,
                    price_impact_bps: 0,
                    path: vec![parse_token(&main.from_token_address)?, parse_token(&main.to_token_address)?],
                });
            }
        }
        // 출력량은 최종 hop에만 알려져 있음
        if let Some(last) = route.last_mut() {
            last.amount_out = amount_out;
        } else {
            route.push(RouteStep {
                source_venue: NAME.to_string(),
                pool_identifier: String::new(),
                amount_out,
                gas_estimate: 0,
                price_impact_bps: 0,
                path: vec![upstream_token(chain, from_token, true), upstream_token(chain, to_token, true)],
            });
        }

        let gas = match parse_leading_u64(&response.gas) {
            0 => response
                .tx
                .as_ref()
                .map(|tx| parse_leading_u64(&tx.gas))
                .filter(|gas| *gas > 0)
                .unwrap_or(DEFAULT_SWAP_GAS),
            gas => gas,
        };

        let is_split = response.protocols.len() > 1 || response.protocols.iter().flatten().any(|parts| parts.len() > 1);
        let hops = response.protocols.iter().map(|r| r.len()).max().unwrap_or(1).max(1) as u32;
        let routing = Some(RoutingInfo {
            is_split,
            hops,
            complexity: match (is_split, hops) {
                (false, 1) => "simple",
                (false, _) => "multi-hop",
                (true, _) => "split",
            }
            .to_string(),
            best_source: route.first().map(|s| s.source_venue.clone()).unwrap_or_default(),
        });

        Ok(NormalizedQuote {
            provider_name: NAME.to_string(),
            chain,
            token_in: from_token,
            token_out: to_token,
            amount_in,
            amount_out,
            route,
            total_gas_estimate: gas,
            fee_breakdown: FeeBreakdown::default(),
            price_impact_bps: 0,
            execution_time_ms: started.elapsed().as_millis() as u64,
            approval_target: self.router(),
            routing,
            transaction: None,
            calldata_binding: None,
            quoted_at: Utc::now(),
            raw_payload: payload,
        })
    }
}

fn parse_token(raw: &str) -> Result<Address, AdapterError> {
    raw.parse()
        .map_err(|_| AdapterError::unavailable(NAME, format!("malformed token address '{}'", raw)))
}

#[async_trait]
impl SwapAdapter for OneInchAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn token(&self) -> &str {
        "1INCH"
    }

    fn referral(&self) -> bool {
        true
    }

    fn is_output_available(&self) -> bool {
        false
    }

    fn supported_chains(&self) -> &[Chain] {
        &Chain::ALL
    }

    fn quotes_native(&self) -> bool {
        true
    }

    fn approval_address(&self, _chain: Chain) -> Address {
        self.router()
    }

    async fn get_quote(
        &self,
        chain: Chain,
        from_token: Address,
        to_token: Address,
        amount_in: U256,
        options: &QuoteOptions,
    ) -> Result<NormalizedQuote, AdapterError> {
        if !self.supports_chain(chain) {
            return Err(AdapterError::UnsupportedChain {
                provider: NAME.to_string(),
                chain,
            });
        }

        let started = Instant::now();
        let request = self.request(chain, from_token, to_token, amount_in, options);
        let payload: serde_json::Value = send_json(NAME, request).await?;
        let mut quote = self.normalize(chain, from_token, to_token, amount_in, payload, started)?;

        if let Some(user) = options.recipient() {
            let slippage = options.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS);
            quote.calldata_binding = Some(CalldataBinding { taker: user, slippage_bps: slippage });
            match self.build_transaction(&quote, user, slippage) {
                Ok(tx) => quote.transaction = Some(tx),
                Err(e) => warn!("⚠️ 1inch quote kept without transaction: {}", e),
            }
        }

        info!("🔀 1inch: {} -> {} ({} gas, {}ms)", amount_in, quote.amount_out, quote.total_gas_estimate, quote.execution_time_ms);
        Ok(quote)
    }

    fn build_transaction(
        &self,
        quote: &NormalizedQuote,
        user: Address,
        slippage_bps: u32,
    ) -> Result<SwapTransaction, AdapterError> {
        // /swap calldata는 from과 slippage가 이미 인코딩되어 있음
        AdapterError::check_binding(NAME, quote, user, slippage_bps)?;
        let tx: TransactionData = quote
            .raw_payload
            .get("tx")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .ok_or_else(|| AdapterError::build_failed(NAME, "quote was fetched without a sender; no calldata"))?;

        let to: Address = tx
            .to
            .parse()
            .map_err(|_| AdapterError::build_failed(NAME, format!("invalid 'to' address: {}", tx.to)))?;
        let data = hex::decode(tx.data.trim_start_matches("0x"))
            .map_err(|e| AdapterError::build_failed(NAME, format!("invalid calldata: {}", e)))?;
        let value = if tx.value.is_empty() {
            U256::ZERO
        } else {
            parse_base_units(&tx.value).map_err(|e| AdapterError::build_failed(NAME, e.to_string()))?
        };
        let gas_limit = match parse_leading_u64(&tx.gas) {
            0 => quote.total_gas_estimate,
            gas => gas,
        };
        debug!("1inch tx to {} ({} bytes calldata)", to, data.len());

        Ok(SwapTransaction {
            from: user,
            to,
            data: Bytes::from(data),
            value,
            gas_limit,
            minimum_amount_out: minimum_amount_out(quote.amount_out, slippage_bps),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::upstream_mock::spawn_get;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    const DAI_BASE: &str = "0x50c5725949a6f0c72e6c4a641f24049a917db0cb";

    fn quote_body() -> serde_json::Value {
        json!({
            "dstAmount": "2480000000",
            "gas": 201000,
            "protocols": [[
                [{"name": "BASE_UNISWAP_V3", "part": 100, "fromTokenAddress": format!("{:#x}", WETH_BASE), "toTokenAddress": DAI_BASE}],
                [
                    {"name": "BASE_CURVE", "part": 60, "fromTokenAddress": DAI_BASE, "toTokenAddress": format!("{:#x}", USDC_BASE)},
                    {"name": "BASE_AERODROME", "part": 40, "fromTokenAddress": DAI_BASE, "toTokenAddress": format!("{:#x}", USDC_BASE)}
                ]
            ]]
        })
    }

    fn swap_body() -> serde_json::Value {
        let mut body = quote_body();
        body["tx"] = json!({
            "from": "0x4242424242424242424242424242424242424242",
            "to": "0x111111125421ca6dc452d289314280a0f8842a65",
            "data": "0x07ed2379",
            "value": "0",
            "gas": 0,
            "gasPrice": "1000000"
        });
        body
    }

    fn adapter(url: &str) -> OneInchAdapter {
        let mut config = AdapterConfig::with_base_url(url);
        config.api_key = Some("test-key".to_string());
        OneInchAdapter::new(config)
    }

    #[tokio::test]
    async fn test_quote_normalizes_multi_hop_route() {
        let (url, recorded) = spawn_get("/swap/v6.0/8453/quote", 200, quote_body()).await;
        let quote = adapter(&url)
            .get_quote(Chain::Base, NATIVE_TOKEN, USDC_BASE, U256::from(1_000_000_000_000_000_000u64), &QuoteOptions::default())
            .await
            .unwrap();

        let sent = recorded.lock().unwrap()[0].clone();
        assert_eq!(sent["src"], format!("{:#x}", NATIVE_PLACEHOLDER));
        assert!(sent.get("from").is_none());

        assert_eq!(quote.token_in, NATIVE_TOKEN);
        assert_eq!(quote.amount_out, U256::from(2_480_000_000u64));
        assert_eq!(quote.total_gas_estimate, 201_000);
        assert_eq!(quote.route.len(), 2);
        assert_eq!(quote.route[1].source_venue, "BASE_CURVE");
        assert_eq!(quote.route[1].amount_out, quote.amount_out);
        let routing = quote.routing.unwrap();
        assert!(routing.is_split);
        assert_eq!(routing.hops, 2);
    }

    #[tokio::test]
    async fn test_swap_with_sender_embeds_tx() {
        let (url, recorded) = spawn_get("/swap/v6.0/8453/swap", 200, swap_body()).await;
        let user = Address::repeat_byte(0x42);
        let options = QuoteOptions {
            user_address: Some(user),
            slippage_bps: Some(100),
        };
        let quote = adapter(&url)
            .get_quote(Chain::Base, USDC_BASE, WETH_BASE, U256::from(2_500_000_000u64), &options)
            .await
            .unwrap();

        let sent = recorded.lock().unwrap()[0].clone();
        assert_eq!(sent["slippage"], "1");
        assert_eq!(sent["from"], format!("{:#x}", user));

        let tx = quote.transaction.unwrap();
        assert_eq!(tx.to, ONEINCH_ROUTER_V6);
        assert_eq!(tx.data, Bytes::from(vec![0x07, 0xed, 0x23, 0x79]));
        // tx.gas가 0이면 견적 가스 사용
        assert_eq!(tx.gas_limit, 201_000);
        assert_eq!(tx.minimum_amount_out, U256::from(2_455_200_000u64));
    }

    #[tokio::test]
    async fn test_bad_request_is_unavailable() {
        let (url, _) = spawn_get("/swap/v6.0/1/quote", 400, json!({"error": "insufficient liquidity"})).await;
        let err = adapter(&url)
            .get_quote(Chain::Ethereum, WETH_ETHEREUM, USDC_BASE, U256::from(1u64), &QuoteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::QuoteUnavailable { status: Some(400), .. }));
        assert!(err.reason().contains("insufficient liquidity"));
    }

    #[test]
    fn test_missing_protocols_uses_direct_path() {
        let adapter = adapter("http://unused");
        let quote = adapter
            .normalize(
                Chain::Arbitrum,
                NATIVE_TOKEN,
                USDC_BASE,
                U256::from(5u64),
                json!({"dstAmount": "7"}),
                Instant::now(),
            )
            .unwrap();
        assert_eq!(quote.route[0].path, vec![NATIVE_PLACEHOLDER, USDC_BASE]);
        assert_eq!(quote.total_gas_estimate, DEFAULT_SWAP_GAS);
    }

    #[tokio::test]
    async fn test_swap_calldata_bound_to_sender_and_slippage() {
        let (url, _) = spawn_get("/swap/v6.0/8453/swap", 200, swap_body()).await;
        let user = Address::repeat_byte(0x42);
        let options = QuoteOptions {
            user_address: Some(user),
            slippage_bps: Some(100),
        };
        let adapter = adapter(&url);
        let quote = adapter
            .get_quote(Chain::Base, USDC_BASE, WETH_BASE, U256::from(2_500_000_000u64), &options)
            .await
            .unwrap();
        assert_eq!(quote.calldata_binding, Some(CalldataBinding { taker: user, slippage_bps: 100 }));

        let err = assert_err!(adapter.build_transaction(&quote, Address::repeat_byte(0x99), 100));
        assert!(matches!(err, AdapterError::TransactionBuildFailed { .. }));
        assert_err!(adapter.build_transaction(&quote, user, 2000));

        let tx = assert_ok!(adapter.build_transaction(&quote, user, 100));
        assert_eq!(tx.minimum_amount_out, U256::from(2_455_200_000u64));
    }

    #[tokio::test]
    async fn test_native_sell_uses_placeholder_and_value() {
        let mut body = swap_body();
        body["tx"]["value"] = json!("1000000000000000000");
        let (url, recorded) = spawn_get("/swap/v6.0/8453/swap", 200, body).await;
        let amount = U256::from(1_000_000_000_000_000_000u64);
        let options = QuoteOptions {
            user_address: Some(Address::repeat_byte(0x42)),
            slippage_bps: Some(100),
        };
        let quote = adapter(&url)
            .get_quote(Chain::Base, NATIVE_TOKEN, USDC_BASE, amount, &options)
            .await
            .unwrap();

        assert_eq!(recorded.lock().unwrap()[0]["src"], format!("{:#x}", NATIVE_PLACEHOLDER));
        assert_eq!(quote.token_in, NATIVE_TOKEN);
        assert_eq!(quote.transaction.unwrap().value, amount);
    }
}
