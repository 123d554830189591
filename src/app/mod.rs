// ==========================================
// 玻璃深加工生产执行系统 - 应用层
// ==========================================
// 职责: 组装仓储/引擎/API，管理后台轮询任务
// ==========================================

pub mod queue_poller;
pub mod state;

// 重导出
pub use queue_poller::{OptimizationQueuePoller, QueueSnapshot};
pub use state::{get_default_db_path, AppState};
