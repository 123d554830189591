// ==========================================
// 玻璃深加工生产执行系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 生产流转状态机 + LISEC 优化机导出
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装与后台任务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ExecutionPhase, LayerKind, StepRole, StepType};

// 领域实体
pub use domain::{
    MicroLine, ProductLayer, ProductionLine, Ref, Step, StepExecution, Treatment,
    TreatmentApplication,
};

// 引擎
pub use engine::{NextStepDecision, NextStepResolver, StepRecorder, TrfEncoder};

// API
pub use api::{ApiError, OptimizationApi, ProductionApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "玻璃深加工生产执行系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
