//! 공통 유틸리티 모듈
//!
//! 금액 변환, 토큰 정규화, 포맷팅, 입력 검증 등
//! 어댑터와 집계기 전반에서 공통으로 사용되는 기능을 포함합니다.

pub mod amounts;
pub mod formatting;
pub mod tokens;
pub mod validation;

pub use amounts::*;
pub use formatting::{format_bps, format_percentage, format_token_amount};
pub use tokens::*;
pub use validation::*;
