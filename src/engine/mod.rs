// ==========================================
// 玻璃深加工生产执行系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL; 决策与编码均为纯计算，持久化由调用方完成
// ==========================================

pub mod next_step;
pub mod optimization_queue;
pub mod step_locator;
pub mod step_recorder;
pub mod trf_encoder;

// 重导出核心引擎
pub use next_step::{NextStep, NextStepDecision, NextStepResolver, ResolveStatus};
pub use optimization_queue::{is_awaiting_optimization, select_for_optimization};
pub use step_locator::{flatten, locate, LocatedStep};
pub use step_recorder::{StepExecutionStore, StepRecorder};
pub use trf_encoder::{TrfDocument, TrfEncoder, TrfError};
