// ==========================================
// 玻璃深加工生产执行系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工序类型 (Step Type)
// ==========================================
// step: 实际加工工序; shelf: 暂存/库位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Step,
    Shelf,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Step => "step",
            StepType::Shelf => "shelf",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "step" => Some(StepType::Step),
            "shelf" => Some(StepType::Shelf),
            _ => None,
        }
    }
}

impl Default for StepType {
    fn default() -> Self {
        StepType::Step
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 工序角色 (Step Role)
// ==========================================
// 替代按名称匹配 "optimizer" 的做法; 未显式声明时按数据推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepRole {
    Optimizer, // 优化排版 (等待 TRF 导出)
    Standard,  // 普通工序
    Holding,   // 暂存库位
}

impl StepRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepRole::Optimizer => "optimizer",
            StepRole::Standard => "standard",
            StepRole::Holding => "holding",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "optimizer" => Some(StepRole::Optimizer),
            "standard" => Some(StepRole::Standard),
            "holding" => Some(StepRole::Holding),
            _ => None,
        }
    }
}

impl fmt::Display for StepRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 玻璃层加工类别 (Layer Kind)
// ==========================================
// 决定 TRF 尺寸补偿规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerKind {
    Normal,
    Waterjet, // 水刀切割
    Ojrati,   // 异形/拼接
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Normal => "NORMAL",
            LayerKind::Waterjet => "WATERJET",
            LayerKind::Ojrati => "OJRATI",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 工序执行阶段 (Execution Phase)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionPhase {
    Entered,   // 进入工序 (进行中)
    Completed, // 完成工序 (passed 表示合格与否)
}

impl ExecutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPhase::Entered => "ENTERED",
            ExecutionPhase::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ENTERED" => Some(ExecutionPhase::Entered),
            "COMPLETED" => Some(ExecutionPhase::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
