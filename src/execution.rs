//! Transaction building and sequential execution

pub mod dispatcher;
pub mod transaction_builder;

pub use dispatcher::{
    AllowanceReader, ExecutionDispatcher, ExecutionError, ExecutionPlanner, ExecutionReport, SubmissionReceipt,
    TransactionSubmitter,
};
pub use transaction_builder::{
    minimum_amount_out, GasEstimate, GasPolicy, GasSimulationError, GasSimulator, TransactionBuilder,
};
