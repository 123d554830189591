// ==========================================
// 玻璃深加工生产执行系统 - 工序执行记录器
// ==========================================
// 职责: 校验并追加工序执行审计记录
// 红线: 只追加; 不更新玻璃层 current_step（"记录历史"与"推进位置"解耦）
// ==========================================

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::step_execution::{StepExecution, StepExecutionDraft};
use crate::domain::types::ExecutionPhase;
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// StepExecutionStore Trait
// ==========================================
// 实现者: StepExecutionRepository（SQLite）
pub trait StepExecutionStore: Send + Sync {
    /// 追加一条记录（失败时不得留下部分记录）
    fn append(&self, execution: &StepExecution) -> RepositoryResult<()>;
}

impl<T: StepExecutionStore + ?Sized> StepExecutionStore for std::sync::Arc<T> {
    fn append(&self, execution: &StepExecution) -> RepositoryResult<()> {
        (**self).append(execution)
    }
}

// ==========================================
// StepRecorder - 工序执行记录器
// ==========================================
pub struct StepRecorder<S: StepExecutionStore> {
    store: S,
}

impl<S: StepExecutionStore> StepRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 记录一次工序执行
    ///
    /// # 校验
    /// - layer_id / step_id / production_line_id 均必填（去空白后非空）
    ///
    /// # 默认值
    /// - scanned_at: 调用时刻 (UTC)
    /// - phase: passed=true → Completed, 否则 Entered
    #[instrument(skip(self, draft), fields(layer_id = %draft.layer_id, step_id = %draft.step_id))]
    pub fn record(&self, draft: StepExecutionDraft) -> RepositoryResult<StepExecution> {
        let layer_id = required("layer_id", &draft.layer_id)?;
        let step_id = required("step_id", &draft.step_id)?;
        let production_line_id = required("production_line_id", &draft.production_line_id)?;

        let phase = draft.phase.unwrap_or(if draft.passed {
            ExecutionPhase::Completed
        } else {
            ExecutionPhase::Entered
        });

        let execution = StepExecution {
            execution_id: Uuid::new_v4().to_string(),
            layer_id,
            step_id,
            production_line_id,
            phase,
            scanned_at: draft.scanned_at.unwrap_or_else(|| Utc::now().naive_utc()),
            treatments_applied: draft.treatments_applied,
            passed: draft.passed,
            notes: draft.notes.filter(|n| !n.trim().is_empty()),
        };

        self.store.append(&execution)?;

        info!(
            execution_id = %execution.execution_id,
            phase = %execution.phase,
            passed = execution.passed,
            "工序执行已记录"
        );
        Ok(execution)
    }
}

fn required(field: &str, value: &str) -> RepositoryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::ValidationError(format!("{} 不能为空", field)));
    }
    Ok(trimmed.to_string())
}
