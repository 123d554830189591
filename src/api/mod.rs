// ==========================================
// 玻璃深加工生产执行系统 - API 层
// ==========================================
// 职责: 编排仓储与引擎，提供生产流转与优化导出接口
// ==========================================

pub mod error;
pub mod optimization_api;
pub mod production_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use optimization_api::{OptimizationApi, TrfExportRequest, TrfExportResponse};
pub use production_api::{
    AdvanceOutcome, AdvanceRequest, BatchAdvanceItem, BatchAdvanceReport, ProductionApi,
    RecordOutcomeRequest, ScanResult,
};
