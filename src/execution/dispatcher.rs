use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::transaction_builder::{GasEstimate, TransactionBuilder};
use crate::blockchain::abi::encode_approve;
use crate::common::tokens::is_native;
use crate::types::{Chain, ExecutionPlan, ExecutionState, StepKind, SwapTransaction, TxRequest};

/// 제출 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub step: StepKind,
    pub tx_hash: B256,
}

/// 서명/논스/브로드캐스트를 담당하는 외부 제출 협력자
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, request: &TxRequest) -> anyhow::Result<B256>;
}

/// ERC-20 allowance 조회 협력자
#[async_trait]
pub trait AllowanceReader: Send + Sync {
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> anyhow::Result<U256>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("{provider} quote carries no transaction (quote was fetched without a user address)")]
    MissingTransaction { provider: String },

    #[error("Submission of {step} step failed: {message}")]
    SubmissionFailed { step: StepKind, message: String },

    #[error("Execution cancelled before the swap was sent (approval submitted: {approval_submitted})")]
    Cancelled { approval_submitted: bool },
}

/// 실행 결과 보고서
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub plan_id: Uuid,
    pub final_state: ExecutionState,
    pub history: Vec<ExecutionState>,
    pub receipts: Vec<SubmissionReceipt>,
    /// 스왑이 브로드캐스트되어 더 이상 취소할 수 없음
    pub irreversible: bool,
}

/// 실행 계획 수립기 (allowance 확인, 승인 단계, 스왑 가스 패딩)
#[derive(Clone)]
pub struct ExecutionPlanner {
    allowance: Arc<dyn AllowanceReader>,
    builder: TransactionBuilder,
    approval_gas_limit: u64,
}

impl ExecutionPlanner {
    pub fn new(allowance: Arc<dyn AllowanceReader>, builder: TransactionBuilder, approval_gas_limit: u64) -> Self {
        Self {
            allowance,
            builder,
            approval_gas_limit,
        }
    }

    /// 네이티브 입력이 value로 전송되면 승인 불필요. value 없이 네이티브를 파는
    /// 스왑은 wrapped native를 소비하므로 그 토큰을 승인합니다.
    /// 현재 allowance가 amount_in보다 작을 때 approve를 스왑 앞에 두며,
    /// 조회 실패 시 부족한 것으로 간주합니다.
    /// 가스 패딩은 마지막(스왑) 단계에만 적용됩니다.
    pub async fn plan(
        &self,
        chain: Chain,
        token_in: Address,
        amount_in: U256,
        spender: Address,
        swap: &SwapTransaction,
    ) -> ExecutionPlan {
        let spent_token = match (is_native(token_in), swap.value.is_zero()) {
            (true, false) => None,
            (true, true) => Some(chain.wrapped_native()),
            (false, _) => Some(token_in),
        };
        let approval = match spent_token {
            None => None,
            Some(token) => {
                let sufficient = match self.allowance.allowance(token, swap.from, spender).await {
                    Ok(current) => current >= amount_in,
                    Err(e) => {
                        warn!("⚠️ Allowance lookup failed, adding approval step: {}", e);
                        false
                    }
                };
                (!sufficient).then(|| TxRequest {
                    from: swap.from,
                    to: token,
                    data: encode_approve(spender, amount_in),
                    value: U256::ZERO,
                    gas_limit: Some(self.approval_gas_limit),
                })
            }
        };

        let mut plan = ExecutionPlan::new(chain, approval, TxRequest::from(swap));
        if let Some(step) = plan.swap_step() {
            let estimate = self.builder.estimate(&step.request, swap.gas_limit).await;
            if let GasEstimate::Simulated { .. } = estimate {
                plan.set_final_gas_limit(estimate.gas_limit());
            }
        }

        info!(
            "📋 Plan {} on {}: {} step(s), approval required: {}",
            plan.id,
            chain,
            plan.len(),
            plan.requires_approval()
        );
        plan
    }
}

/// 승인 → 스왑 순차 실행기
pub struct ExecutionDispatcher {
    planner: ExecutionPlanner,
    submitter: Arc<dyn TransactionSubmitter>,
    state: watch::Sender<ExecutionState>,
}

impl ExecutionDispatcher {
    pub fn new(planner: ExecutionPlanner, submitter: Arc<dyn TransactionSubmitter>) -> Self {
        let (state, _) = watch::channel(ExecutionState::Planned);
        Self {
            planner,
            submitter,
            state,
        }
    }

    pub fn planner(&self) -> &ExecutionPlanner {
        &self.planner
    }

    /// 상태 변화 구독
    pub fn subscribe(&self) -> watch::Receiver<ExecutionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ExecutionState {
        *self.state.borrow()
    }

    pub async fn plan(
        &self,
        chain: Chain,
        token_in: Address,
        amount_in: U256,
        spender: Address,
        swap: &SwapTransaction,
    ) -> ExecutionPlan {
        let plan = self.planner.plan(chain, token_in, amount_in, spender, swap).await;
        self.state.send_replace(ExecutionState::Planned);
        plan
    }

    /// 계획을 순서대로 제출 (첫 실패에서 중단, 롤백 없음)
    pub async fn execute(&self, plan: ExecutionPlan, cancel: &CancellationToken) -> Result<ExecutionReport, ExecutionError> {
        let mut history = vec![ExecutionState::Planned];
        let mut receipts = Vec::with_capacity(plan.len());
        self.state.send_replace(ExecutionState::Planned);

        for step in plan.steps() {
            if cancel.is_cancelled() {
                warn!("🛑 Plan {} cancelled before {} step", plan.id, step.kind);
                self.transition(&mut history, ExecutionState::Failed);
                return Err(ExecutionError::Cancelled {
                    approval_submitted: !receipts.is_empty(),
                });
            }

            let pending = match step.kind {
                StepKind::Approval => ExecutionState::ApprovalPending,
                StepKind::Swap => ExecutionState::SwapPending,
            };
            self.transition(&mut history, pending);

            info!("📤 Submitting {} step of plan {} to {}", step.kind, plan.id, step.request.to);
            match self.submitter.submit(&step.request).await {
                Ok(tx_hash) => {
                    info!("✅ {} step submitted: {}", step.kind, tx_hash);
                    receipts.push(SubmissionReceipt { step: step.kind, tx_hash });
                }
                Err(e) => {
                    error!("❌ {} step failed: {}", step.kind, e);
                    self.transition(&mut history, ExecutionState::Failed);
                    return Err(ExecutionError::SubmissionFailed {
                        step: step.kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.transition(&mut history, ExecutionState::Submitted);
        info!("🚀 Plan {} submitted; swap is pending and irreversible", plan.id);

        Ok(ExecutionReport {
            plan_id: plan.id,
            final_state: ExecutionState::Submitted,
            history,
            receipts,
            irreversible: true,
        })
    }

    fn transition(&self, history: &mut Vec<ExecutionState>, next: ExecutionState) {
        history.push(next);
        self.state.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::abi::IERC20;
    use crate::constants::{NATIVE_TOKEN, USDC_BASE, WETH_BASE};
    use crate::execution::transaction_builder::GasPolicy;
    use crate::mocks::{MockAllowanceReader, MockGasSimulator, MockSubmitter};
    use alloy::primitives::{address, Bytes};
    use alloy::sol_types::SolCall;
    use std::time::Duration;

    const SPENDER: Address = address!("0x7777777777777777777777777777777777777777");

    fn swap_tx(value: U256) -> SwapTransaction {
        SwapTransaction {
            from: Address::repeat_byte(0x11),
            to: Address::repeat_byte(0x22),
            data: Bytes::from(vec![0x01, 0x02, 0x03]),
            value,
            gas_limit: 150_000,
            minimum_amount_out: U256::from(1u64),
        }
    }

    fn dispatcher(submitter: Arc<MockSubmitter>, allowance: U256, simulator: MockGasSimulator) -> ExecutionDispatcher {
        let builder = TransactionBuilder::new(Arc::new(simulator), GasPolicy::default(), Duration::from_millis(200));
        let planner = ExecutionPlanner::new(Arc::new(MockAllowanceReader::fixed(allowance)), builder, 60_000);
        ExecutionDispatcher::new(planner, submitter)
    }

    #[tokio::test]
    async fn test_insufficient_allowance_plans_approval_then_swap() {
        let submitter = Arc::new(MockSubmitter::new());
        let dispatcher = dispatcher(submitter.clone(), U256::ZERO, MockGasSimulator::succeeding(200_000));
        let amount = U256::from(1_000_000u64);

        let plan = dispatcher.plan(Chain::Base, USDC_BASE, amount, SPENDER, &swap_tx(U256::ZERO)).await;
        let kinds: Vec<StepKind> = plan.steps().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Approval, StepKind::Swap]);

        let approval = &plan.steps()[0].request;
        assert_eq!(approval.to, USDC_BASE);
        let decoded = IERC20::approveCall::abi_decode(&approval.data).unwrap();
        assert_eq!(decoded.spender, SPENDER);
        assert_eq!(decoded.amount, amount);

        // 패딩은 스왑에만
        assert_eq!(approval.gas_limit, Some(60_000));
        assert_eq!(plan.swap_step().unwrap().request.gas_limit, Some(200_000 * 12 / 10 + 86_000));

        let report = dispatcher.execute(plan, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.final_state, ExecutionState::Submitted);
        assert_eq!(
            report.history,
            vec![
                ExecutionState::Planned,
                ExecutionState::ApprovalPending,
                ExecutionState::SwapPending,
                ExecutionState::Submitted
            ]
        );
        assert!(report.irreversible);

        let sent = submitter.submitted();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, USDC_BASE);
        assert_eq!(sent[1].to, Address::repeat_byte(0x22));
    }

    #[tokio::test]
    async fn test_sufficient_allowance_skips_approval() {
        let submitter = Arc::new(MockSubmitter::new());
        let dispatcher = dispatcher(submitter, U256::MAX, MockGasSimulator::succeeding(100_000));
        let plan = dispatcher
            .plan(Chain::Base, USDC_BASE, U256::from(10u64), SPENDER, &swap_tx(U256::ZERO))
            .await;
        assert_eq!(plan.len(), 1);
        assert!(!plan.requires_approval());
    }

    #[tokio::test]
    async fn test_native_input_with_value_skips_approval() {
        let submitter = Arc::new(MockSubmitter::new());
        let dispatcher = dispatcher(submitter, U256::ZERO, MockGasSimulator::failing("reverted"));
        let amount = U256::from(1_000_000_000_000_000_000u64);
        let plan = dispatcher.plan(Chain::Base, NATIVE_TOKEN, amount, SPENDER, &swap_tx(amount)).await;

        assert_eq!(plan.len(), 1);
        // 시뮬레이션 실패 → 정적 추정치 유지
        assert_eq!(plan.swap_step().unwrap().request.gas_limit, Some(150_000));
        assert_eq!(plan.swap_step().unwrap().request.value, amount);
    }

    #[tokio::test]
    async fn test_approval_failure_aborts_before_swap() {
        let submitter = Arc::new(MockSubmitter::new().fail_on_call(0));
        let dispatcher = dispatcher(submitter.clone(), U256::ZERO, MockGasSimulator::succeeding(100_000));
        let plan = dispatcher
            .plan(Chain::Base, USDC_BASE, U256::from(5u64), SPENDER, &swap_tx(U256::ZERO))
            .await;

        let err = dispatcher.execute(plan, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::SubmissionFailed { step: StepKind::Approval, .. }));
        assert_eq!(submitter.submitted().len(), 1);
        assert_eq!(dispatcher.state(), ExecutionState::Failed);
    }

    #[tokio::test]
    async fn test_cancel_between_approval_and_swap() {
        let cancel = CancellationToken::new();
        let submitter = Arc::new(MockSubmitter::new().cancel_after_first(cancel.clone()));
        let dispatcher = dispatcher(submitter.clone(), U256::ZERO, MockGasSimulator::succeeding(100_000));
        let plan = dispatcher
            .plan(Chain::Base, USDC_BASE, U256::from(5u64), SPENDER, &swap_tx(U256::ZERO))
            .await;

        let err = dispatcher.execute(plan, &cancel).await.unwrap_err();
        assert_eq!(err, ExecutionError::Cancelled { approval_submitted: true });
        assert_eq!(submitter.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_state_subscription_sees_final_state() {
        let submitter = Arc::new(MockSubmitter::new());
        let dispatcher = dispatcher(submitter, U256::MAX, MockGasSimulator::succeeding(100_000));
        let mut rx = dispatcher.subscribe();
        let plan = dispatcher
            .plan(Chain::Base, USDC_BASE, U256::from(5u64), SPENDER, &swap_tx(U256::ZERO))
            .await;
        dispatcher.execute(plan, &CancellationToken::new()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ExecutionState::Submitted);
    }

    #[tokio::test]
    async fn test_allowance_lookup_failure_adds_approval() {
        let builder = TransactionBuilder::new(
            Arc::new(MockGasSimulator::failing("no rpc")),
            GasPolicy::default(),
            Duration::from_millis(50),
        );
        let planner = ExecutionPlanner::new(Arc::new(MockAllowanceReader::failing()), builder, 60_000);
        let plan = planner
            .plan(Chain::Base, USDC_BASE, U256::from(5u64), SPENDER, &swap_tx(U256::ZERO))
            .await;
        assert!(plan.requires_approval());
        assert_eq!(plan.len(), 2);
    }

    #[tokio::test]
    async fn test_native_input_without_value_approves_wrapped() {
        let submitter = Arc::new(MockSubmitter::new());
        let dispatcher = dispatcher(submitter, U256::ZERO, MockGasSimulator::failing("no rpc"));
        let amount = U256::from(1_000u64);

        let plan = dispatcher.plan(Chain::Base, NATIVE_TOKEN, amount, SPENDER, &swap_tx(U256::ZERO)).await;

        assert!(plan.requires_approval());
        assert_eq!(plan.steps()[0].request.to, WETH_BASE);
    }
}
