// ==========================================
// 玻璃深加工生产执行系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod layer;
pub mod production_line;
pub mod reference;
pub mod step_execution;
pub mod treatment;
pub mod types;

// 重导出核心类型
pub use layer::{Customer, Glass, Invoice, ProductLayer};
pub use production_line::{
    MicroLine, MicroLineRef, ProductionLine, Step, StepRef, OPTIMIZER_STEP_NAME,
};
pub use reference::{normalize_id, same_id, Identified, Ref};
pub use step_execution::{StepExecution, StepExecutionDraft};
pub use treatment::{Treatment, TreatmentApplication};
pub use types::{ExecutionPhase, LayerKind, StepRole, StepType};
