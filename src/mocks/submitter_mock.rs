use std::sync::Mutex;

use alloy::primitives::B256;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::execution::dispatcher::TransactionSubmitter;
use crate::types::TxRequest;

/// 제출 요청을 기록하는 Mock 제출기
#[derive(Default)]
pub struct MockSubmitter {
    submitted: Mutex<Vec<TxRequest>>,
    fail_on_call: Option<usize>,
    cancel_after_first: Option<CancellationToken>,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// n번째(0부터) 제출에서 실패
    pub fn fail_on_call(mut self, index: usize) -> Self {
        self.fail_on_call = Some(index);
        self
    }

    /// 첫 제출 직후 토큰 취소
    pub fn cancel_after_first(mut self, token: CancellationToken) -> Self {
        self.cancel_after_first = Some(token);
        self
    }

    pub fn submitted(&self) -> Vec<TxRequest> {
        self.submitted.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TransactionSubmitter for MockSubmitter {
    async fn submit(&self, request: &TxRequest) -> anyhow::Result<B256> {
        let index = {
            let mut submitted = self.submitted.lock().unwrap_or_else(|e| e.into_inner());
            submitted.push(request.clone());
            submitted.len() - 1
        };
        debug!("mock submit #{} to {}", index, request.to);

        if self.fail_on_call == Some(index) {
            anyhow::bail!("mock submission #{} rejected", index);
        }
        if index == 0 {
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
        }
        Ok(B256::with_last_byte(index as u8 + 1))
    }
}
