use alloy::primitives::Address;

use crate::constants::{NATIVE_PLACEHOLDER, NATIVE_TOKEN};
use crate::types::Chain;

/// 네이티브 자산 센티널 여부
pub fn is_native(token: Address) -> bool {
    token == NATIVE_TOKEN
}

/// 네이티브 센티널을 체인의 wrapped native 주소로 변환 (그 외 주소는 그대로)
pub fn normalize_token(chain: Chain, token: Address) -> Address {
    if is_native(token) {
        chain.wrapped_native()
    } else {
        token
    }
}

/// 업스트림 API로 보낼 소문자 hex 주소
pub fn provider_facing(chain: Chain, token: Address) -> String {
    format!("{:#x}", normalize_token(chain, token))
}

/// 프로바이더가 실제로 견적하는 토큰
///
/// 네이티브를 직접 견적하는 프로바이더에는 플레이스홀더를, 아니면 wrapped native를 보냅니다.
pub fn upstream_token(chain: Chain, token: Address, quotes_native: bool) -> Address {
    match (is_native(token), quotes_native) {
        (true, true) => NATIVE_PLACEHOLDER,
        _ => normalize_token(chain, token),
    }
}
