//! Task registration, configuration, planning and execution for Keel.

pub mod configure;
pub mod doctor;
pub mod error;
pub mod execute;
pub mod init;
pub mod naming;
pub mod plan;
pub mod publish;
pub mod registry;
pub mod task;

pub use configure::configure;
pub use error::EngineError;
pub use execute::{execute, ExecuteOptions, ExecutionReport, TaskFailure, TaskOutcome};
pub use init::init_workspace;
pub use plan::ExecutionPlan;
pub use registry::TaskGraph;
pub use task::{Task, TaskAction, TaskState};
