use std::path::Path;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alpha_swap_aggregator::blockchain::BlockchainClient;
use alpha_swap_aggregator::common::{format_bps, format_percentage, format_token_amount, parse_address, to_base_units};
use alpha_swap_aggregator::constants::NATIVE_TOKEN;
use alpha_swap_aggregator::execution::{AllowanceReader, GasSimulator};
use alpha_swap_aggregator::mocks::{self, MockAllowanceReader, MockGasSimulator};
use alpha_swap_aggregator::{
    AggregatedQuotes, AdapterRegistry, Chain, Config, ExecutionPlanner, QuoteAggregator, SwapRequest,
    TransactionBuilder,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("aggregator")
        .version(env!("CARGO_PKG_VERSION"))
        .about("🔀 멀티 프로바이더 스왑 견적 집계기")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로")
                .default_value("config/default.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("chain")
                .long("chain")
                .value_name("CHAIN")
                .help("체인 (ethereum, base, arbitrum, optimism)")
                .default_value("base"),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .value_name("TOKEN")
                .help("입력 토큰 주소 (네이티브는 'native')")
                .required(true),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .value_name("TOKEN")
                .help("출력 토큰 주소 (네이티브는 'native')")
                .required(true),
        )
        .arg(
            Arg::new("amount")
                .long("amount")
                .value_name("AMOUNT")
                .help("입력 수량 (사람 단위, 예: 1.5)")
                .required(true),
        )
        .arg(
            Arg::new("decimals")
                .long("decimals")
                .value_name("N")
                .help("입력 토큰 소수 자릿수")
                .value_parser(clap::value_parser!(u8))
                .default_value("18"),
        )
        .arg(
            Arg::new("out-decimals")
                .long("out-decimals")
                .value_name("N")
                .help("출력 토큰 소수 자릿수")
                .value_parser(clap::value_parser!(u8))
                .default_value("6"),
        )
        .arg(
            Arg::new("slippage-bps")
                .long("slippage-bps")
                .value_name("BPS")
                .help("슬리피지 허용치 (bps, 기본값은 설정 파일)")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .value_name("ADDRESS")
                .help("지갑 주소 (지정 시 트랜잭션 생성)"),
        )
        .arg(
            Arg::new("plan")
                .long("plan")
                .help("승인 + 스왑 실행 계획 출력 (--user 필요)")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = matches.get_one::<String>("log-level").map(String::as_str).unwrap_or("info");
    let log_filter = match log_level {
        "trace" | "debug" | "info" | "warn" | "error" => log_level,
        _ => "info",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config/default.toml");
    let mut config = if Path::new(config_path).exists() {
        info!("📋 설정 파일 로드 중: {}", config_path);
        Config::load(config_path).await?
    } else {
        warn!("⚠️ 설정 파일 없음 ({}), 기본값 사용", config_path);
        Config::default()
    };
    config.apply_env_overrides();
    if let Err(e) = config.validate() {
        error!("❌ 설정 검증 실패: {}", e);
        std::process::exit(1);
    }

    let chain: Chain = required(&matches, "chain")?.parse().map_err(anyhow::Error::msg)?;
    let from_token = parse_token(required(&matches, "from")?)?;
    let to_token = parse_token(required(&matches, "to")?)?;
    let decimals = matches.get_one::<u8>("decimals").copied().unwrap_or(18);
    let out_decimals = matches.get_one::<u8>("out-decimals").copied().unwrap_or(6);
    let amount_in = to_base_units(required(&matches, "amount")?, decimals).context("invalid --amount")?;
    let slippage_bps = matches
        .get_one::<u32>("slippage-bps")
        .copied()
        .unwrap_or(config.aggregator.default_slippage_bps);

    let mut request = SwapRequest::new(chain, from_token, to_token, amount_in).with_slippage_bps(slippage_bps);
    if let Some(user) = matches.get_one::<String>("user") {
        request = request.with_user(parse_address(user).map_err(anyhow::Error::msg)?);
    }

    let mock_mode = mocks::is_mock_mode();
    let registry = if mock_mode {
        info!("🧪 Mock 모드 활성화 - 외부 API를 호출하지 않습니다");
        mocks::mock_registry(&mocks::get_mock_config())
    } else {
        AdapterRegistry::from_config(&config.adapters)
    };
    let aggregator = QuoteAggregator::new(registry, config.aggregator.quote_timeout());

    if request.user_address.is_none() {
        let quotes = aggregator.aggregate(&request).await?;
        print_quotes(&quotes, out_decimals);
        return Ok(());
    }

    let (simulator, allowance) = collaborators(&config, chain, mock_mode)?;
    let builder = TransactionBuilder::new(simulator, config.gas.policy(), config.gas.simulation_timeout());
    let prepared = aggregator.prepare(&request, &builder).await?;
    print_quotes(&prepared.quotes, out_decimals);

    println!("\n🧾 Transaction ({})", if prepared.gas.is_simulated() { "simulated gas" } else { "static gas" });
    println!("{}", serde_json::to_string_pretty(&prepared.transaction)?);

    if matches.get_flag("plan") {
        let planner = ExecutionPlanner::new(allowance, builder, config.gas.approval_gas_limit);
        let plan = planner
            .plan(
                chain,
                from_token,
                amount_in,
                prepared.quotes.best.approval_target,
                &prepared.transaction,
            )
            .await;
        println!("\n📋 Execution plan");
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }

    Ok(())
}

fn required<'a>(matches: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("--{} is required", name))
}

fn parse_token(value: &str) -> Result<Address> {
    if value.eq_ignore_ascii_case("native") {
        return Ok(NATIVE_TOKEN);
    }
    parse_address(value).map_err(anyhow::Error::msg)
}

/// 가스 시뮬레이터와 allowance 조회기 (mock 모드가 아니면 체인 RPC 필요)
fn collaborators(
    config: &Config,
    chain: Chain,
    mock_mode: bool,
) -> Result<(Arc<dyn GasSimulator>, Arc<dyn AllowanceReader>)> {
    if mock_mode {
        let mock_config = mocks::get_mock_config();
        let simulator: Arc<dyn GasSimulator> = Arc::new(MockGasSimulator::succeeding(mock_config.simulated_gas));
        let allowance: Arc<dyn AllowanceReader> = Arc::new(MockAllowanceReader::fixed(U256::ZERO));
        return Ok((simulator, allowance));
    }

    let rpc_url = config.rpc_url(chain).ok_or_else(|| {
        anyhow::anyhow!(
            "No RPC URL configured for {}; set [rpc.urls] or RPC_URL_{}",
            chain,
            chain.name().to_uppercase()
        )
    })?;
    info!("🔌 RPC 연결 중: {}", rpc_url);
    let client = Arc::new(BlockchainClient::connect(chain, rpc_url)?);
    let simulator: Arc<dyn GasSimulator> = client.clone();
    let allowance: Arc<dyn AllowanceReader> = client;
    Ok((simulator, allowance))
}

fn print_quotes(quotes: &AggregatedQuotes, out_decimals: u8) {
    let best = &quotes.best;
    println!("🏆 Best: {} → {}", best.provider_name, format_token_amount(best.amount_out, out_decimals, ""));
    println!(
        "   gas {}, price impact {} ({:?}), approval target {}",
        best.total_gas_estimate,
        format_bps(best.price_impact_bps),
        best.price_impact_severity(),
        best.approval_target
    );
    if let Some(routing) = &best.routing {
        println!(
            "   route: {} hop(s), split: {}, best source: {}",
            routing.hops,
            routing.is_split,
            routing.best_source
        );
    }

    println!("\n{:<16} {:>28} {:>12}", "provider", "amount out", "vs best");
    for entry in &quotes.comparisons {
        match (entry.amount_out, entry.delta_percent) {
            (Some(amount_out), Some(delta)) if entry.available => println!(
                "{:<16} {:>28} {:>12}",
                entry.provider_name,
                format_token_amount(amount_out, out_decimals, ""),
                format!("-{}", format_percentage(delta))
            ),
            _ => println!(
                "{:<16} {:>28} {:>12}",
                entry.provider_name,
                "unavailable",
                entry.unavailable_reason.as_deref().unwrap_or("")
            ),
        }
    }

    if let Some(summary) = &quotes.summary {
        println!(
            "\n💰 {} beats {} by {} ({})",
            summary.best_provider,
            summary.runner_up,
            format_token_amount(summary.savings, out_decimals, ""),
            format_percentage(summary.savings_percent)
        );
    }
}
