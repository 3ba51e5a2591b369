use alloy::primitives::U256;
use rust_decimal::Decimal;

use crate::adapters::traits::AdapterError;
use crate::types::{ComparisonEntry, NormalizedQuote, QuoteSummary};

const FRACTION_SCALE: u32 = 12;

/// 후보가 현 최선보다 나은지: 출력량이 크거나, 같으면 가스가 적을 때
/// 완전히 같으면 먼저 등록된 쪽이 유지됩니다.
pub fn is_better(candidate: &NormalizedQuote, incumbent: &NormalizedQuote) -> bool {
    candidate.amount_out > incumbent.amount_out
        || (candidate.amount_out == incumbent.amount_out && candidate.total_gas_estimate < incumbent.total_gas_estimate)
}

/// 등록 순서대로 주어진 견적 중 최선의 인덱스
pub fn select_best<'a>(quotes: impl IntoIterator<Item = (usize, &'a NormalizedQuote)>) -> Option<usize> {
    let mut best: Option<(usize, &NormalizedQuote)> = None;
    for (index, quote) in quotes {
        match best {
            Some((_, incumbent)) if !is_better(quote, incumbent) => {}
            _ => best = Some((index, quote)),
        }
    }
    best.map(|(index, _)| index)
}

/// delta / best, 소수점 12자리 정밀도 (best가 0이면 0)
pub fn delta_fraction(delta: U256, best: U256) -> Decimal {
    if best.is_zero() {
        return Decimal::ZERO;
    }
    let scale = U256::from(10u64).pow(U256::from(FRACTION_SCALE));
    let scaled = match delta.checked_mul(scale) {
        Some(product) => product / best,
        None => delta / (best / scale),
    };
    let scaled = u64::try_from(scaled).unwrap_or(u64::MAX);
    Decimal::from_i128_with_scale(scaled as i128, FRACTION_SCALE).normalize()
}

/// 우승자를 제외한 모든 어댑터의 비교 항목 (등록 순서)
pub fn build_comparisons(
    outcomes: &[(String, Result<NormalizedQuote, AdapterError>)],
    best_index: usize,
) -> Vec<ComparisonEntry> {
    let best_out = match &outcomes[best_index].1 {
        Ok(best) => best.amount_out,
        Err(_) => U256::ZERO,
    };

    outcomes
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != best_index)
        .map(|(_, (name, outcome))| match outcome {
            Ok(quote) => {
                let delta = best_out.saturating_sub(quote.amount_out);
                ComparisonEntry::available(name, quote.amount_out, delta, delta_fraction(delta, best_out))
            }
            Err(e) => ComparisonEntry::unavailable(name, e.reason()),
        })
        .collect()
}

/// 최선 vs 차선 요약 (차선이 없으면 None)
pub fn summarize(
    outcomes: &[(String, Result<NormalizedQuote, AdapterError>)],
    best_index: usize,
) -> Option<QuoteSummary> {
    let best = outcomes[best_index].1.as_ref().ok()?;
    let runner_up_index = select_best(
        outcomes
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != best_index)
            .filter_map(|(index, (_, outcome))| outcome.as_ref().ok().map(|q| (index, q))),
    )?;
    let (runner_name, runner_up) = match &outcomes[runner_up_index] {
        (name, Ok(quote)) => (name, quote),
        _ => return None,
    };

    let savings = best.amount_out.saturating_sub(runner_up.amount_out);
    Some(QuoteSummary {
        best_provider: best.provider_name.clone(),
        runner_up: runner_name.clone(),
        savings,
        savings_percent: delta_fraction(savings, best.amount_out),
    })
}
