//! 사람이 읽는 금액 <-> 온체인 base unit 변환
//!
//! 모든 연산은 U256 정수 연산으로 수행하며 부동소수점을 쓰지 않습니다.

use alloy::primitives::U256;
use thiserror::Error;

use crate::constants::MAX_TOKEN_DECIMALS;

/// 금액 파싱 에러
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },
}

impl AmountError {
    fn invalid(input: &str, reason: impl Into<String>) -> Self {
        AmountError::InvalidAmount {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

fn scale(input: &str, decimals: u8) -> Result<U256, AmountError> {
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(AmountError::invalid(input, format!("decimals {} exceeds {}", decimals, MAX_TOKEN_DECIMALS)));
    }
    Ok(U256::from(10u64).pow(U256::from(decimals)))
}

/// "1.5" (decimals=6) -> 1500000
pub fn to_base_units(human: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = human.trim();
    if trimmed.is_empty() {
        return Err(AmountError::invalid(human, "empty"));
    }
    if trimmed.starts_with('-') {
        return Err(AmountError::invalid(human, "negative"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::invalid(human, "no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::invalid(human, "not a decimal number"));
    }

    // 토큰 정밀도를 넘는 자릿수는 0일 때만 허용
    let significant_fraction = fraction.trim_end_matches('0');
    if significant_fraction.len() > decimals as usize {
        return Err(AmountError::invalid(human, format!("more than {} fractional digits", decimals)));
    }

    let unit = scale(human, decimals)?;
    let whole_value = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|e| AmountError::invalid(human, e.to_string()))?
    };

    let padded = format!("{:0<width$}", significant_fraction, width = decimals as usize);
    let fraction_value = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10).map_err(|e| AmountError::invalid(human, e.to_string()))?
    };

    whole_value
        .checked_mul(unit)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(|| AmountError::invalid(human, "overflow"))
}

/// Base-unit 문자열 버전
pub fn to_base_units_string(human: &str, decimals: u8) -> Result<String, AmountError> {
    to_base_units(human, decimals).map(|v| v.to_string())
}

/// 1500000 (decimals=6) -> "1.5"; 소수부 뒤쪽 0은 제거
///
/// 결과는 항상 정규형(앞쪽 0, 뒤쪽 소수 0 없음)이므로 `to_base_units`와의 왕복은
/// 정규형 입력에서만 문자열이 같습니다. "0.50"은 "0.5"로, "007"은 "7"로 돌아옵니다.
pub fn from_base_units(base: U256, decimals: u8) -> Result<String, AmountError> {
    let unit = scale(&base.to_string(), decimals)?;
    let whole = base / unit;
    let fraction = base % unit;

    if fraction.is_zero() {
        return Ok(whole.to_string());
    }

    let fraction_str = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    Ok(format!("{}.{}", whole, fraction_str.trim_end_matches('0')))
}

/// 문자열 base unit 입력 버전
pub fn from_base_units_str(base: &str, decimals: u8) -> Result<String, AmountError> {
    let value = parse_base_units(base)?;
    from_base_units(value, decimals)
}

/// 정수 base unit 문자열 파싱
pub fn parse_base_units(base: &str) -> Result<U256, AmountError> {
    let trimmed = base.trim();
    if trimmed.starts_with('-') {
        return Err(AmountError::invalid(base, "negative"));
    }
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::invalid(base, "not an integer"));
    }
    U256::from_str_radix(trimmed, 10).map_err(|e| AmountError::invalid(base, e.to_string()))
}
