use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::traits::AdapterError;

/// HTTP 클라이언트 생성 (어댑터별 타임아웃)
pub fn build_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// 요청 전송 후 JSON 응답 파싱; 실패는 모두 QuoteUnavailable
pub async fn send_json<T: DeserializeOwned>(provider: &str, request: RequestBuilder) -> Result<T, AdapterError> {
    let response = request
        .send()
        .await
        .map_err(|e| AdapterError::unavailable(provider, format!("network error: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::http(provider, status.as_u16(), body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AdapterError::unavailable(provider, format!("malformed response: {}", e)))
}

/// 문자열 또는 숫자로 오는 필드를 문자열로 수용
pub fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}

/// 앞쪽 숫자만 읽는 관대한 정수 파싱 ("21000.5" -> 21000, "abc" -> 0)
pub fn parse_leading_u64(raw: &str) -> u64 {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// 퍼센트 → bps (음수/비정상 값은 0)
pub fn percent_to_bps(percent: f64) -> u32 {
    if !percent.is_finite() || percent <= 0.0 {
        return 0;
    }
    (percent * 100.0).round().min(u32::MAX as f64) as u32
}

pub fn bps_to_percent(bps: u32) -> f64 {
    bps as f64 / 100.0
}
