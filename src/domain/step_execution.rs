// ==========================================
// 玻璃深加工生产执行系统 - 工序执行记录
// ==========================================
// 红线: 只追加，不修改，不删除
// 同一 (layer, step) 可有多条记录（返工/重新进入）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::treatment::TreatmentApplication;
use crate::domain::types::ExecutionPhase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    pub execution_id: String,
    pub layer_id: String,
    pub step_id: String,
    pub production_line_id: String,
    pub phase: ExecutionPhase,
    pub scanned_at: NaiveDateTime,
    pub treatments_applied: Vec<TreatmentApplication>,
    pub passed: bool,
    pub notes: Option<String>,
}

/// 工序执行记录请求（由调用方组装，交给记录器）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepExecutionDraft {
    pub layer_id: String,
    pub step_id: String,
    pub production_line_id: String,
    pub phase: Option<ExecutionPhase>,
    pub passed: bool,
    pub notes: Option<String>,
    pub treatments_applied: Vec<TreatmentApplication>,
    pub scanned_at: Option<NaiveDateTime>,
}

impl StepExecutionDraft {
    pub fn new(layer_id: &str, step_id: &str, production_line_id: &str, passed: bool) -> Self {
        Self {
            layer_id: layer_id.to_string(),
            step_id: step_id.to_string(),
            production_line_id: production_line_id.to_string(),
            phase: None,
            passed,
            notes: None,
            treatments_applied: Vec::new(),
            scanned_at: None,
        }
    }

    pub fn with_phase(mut self, phase: ExecutionPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_treatments(mut self, treatments: Vec<TreatmentApplication>) -> Self {
        self.treatments_applied = treatments;
        self
    }

    pub fn at(mut self, scanned_at: NaiveDateTime) -> Self {
        self.scanned_at = Some(scanned_at);
        self
    }
}
