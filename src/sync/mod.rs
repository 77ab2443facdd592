//! Planning and running rsync

pub mod executor;
pub mod planner;

pub use executor::{
    wait_for_exit, ExecutorConfig, LogLine, RunEvent, RunId, RunReceiver, RunSender, RunStatus,
    SyncCompletion, SyncExecutor, SyncRun,
};
pub use planner::{plan, PlanInput, SyncRequest};
