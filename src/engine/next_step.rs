// ==========================================
// 玻璃深加工生产执行系统 - 下一工序解析器
// ==========================================
// 职责: 根据玻璃层当前位置与产线图计算下一工序
// 输入: ProductLayer（production_line 必须已填充）
// 输出: NextStepDecision（next + status）
// 红线: 纯决策，不写库；回退到首工序时必须输出告警信号
// ==========================================

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::layer::ProductLayer;
use crate::domain::production_line::Step;
use crate::domain::reference::Ref;
use crate::engine::step_locator::{flatten, locate, LocatedStep};

// ==========================================
// 输出类型
// ==========================================

/// 下一工序
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextStep {
    pub step: Ref<Step>,
    pub step_id: String,
    pub micro_line_id: String,
    pub micro_line_index: usize,
    pub global_index: usize,
    pub is_new_micro_line: bool,
}

impl NextStep {
    fn from_located(located: &LocatedStep, is_new_micro_line: bool) -> Self {
        Self {
            step: located.step.clone(),
            step_id: located.step_id().to_string(),
            micro_line_id: located.micro_line_id.clone(),
            micro_line_index: located.micro_line_index,
            global_index: located.global_index,
            is_new_micro_line,
        }
    }
}

/// 解析状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolveStatus {
    Started,         // 无当前工序 → 首工序
    Advanced,        // 正常前进
    Completed,       // 已在末工序（产线完成）
    EmptyLine,       // 产线展平为空
    LineUnresolved,  // 产线缺失或未填充
    FallbackToFirst { stale_step_id: String }, // 当前工序不在产线中，回退首工序
}

/// 下一工序决策
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextStepDecision {
    pub next: Option<NextStep>,
    pub status: ResolveStatus,
}

impl NextStepDecision {
    fn none(status: ResolveStatus) -> Self {
        Self { next: None, status }
    }

    /// 是否为回退结果（需要告警）
    pub fn is_fallback(&self) -> bool {
        matches!(self.status, ResolveStatus::FallbackToFirst { .. })
    }

    /// 是否已完成整条产线
    pub fn is_terminal(&self) -> bool {
        self.status == ResolveStatus::Completed
    }

    /// 无法做出决策（产线缺失/为空）
    pub fn cannot_progress(&self) -> bool {
        matches!(self.status, ResolveStatus::EmptyLine | ResolveStatus::LineUnresolved)
    }

    /// 告警信息（仅回退时）
    pub fn warning(&self) -> Option<String> {
        match &self.status {
            ResolveStatus::FallbackToFirst { stale_step_id } => Some(format!(
                "当前工序 {} 不在产线定义中，已回退到首工序",
                stale_step_id
            )),
            _ => None,
        }
    }
}

// ==========================================
// NextStepResolver - 下一工序解析器
// ==========================================
pub struct NextStepResolver;

impl NextStepResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析下一工序
    ///
    /// # 规则
    /// 1. 产线缺失/未填充 → LineUnresolved
    /// 2. 展平为空 → EmptyLine
    /// 3. 无当前工序 → 首工序 (Started)
    /// 4. 当前工序不在展平序列中 → 首工序 (FallbackToFirst, 告警)
    /// 5. 非末位 → 紧邻下一工序 (Advanced)
    /// 6. 末位 → None (Completed)
    pub fn resolve(&self, layer: &ProductLayer) -> NextStepDecision {
        let line = match layer.production_line.as_ref().and_then(|l| l.resolved()) {
            Some(line) => line,
            None => {
                debug!(layer_id = %layer.id, "产线未填充，无法解析下一工序");
                return NextStepDecision::none(ResolveStatus::LineUnresolved);
            }
        };

        let flattened = flatten(line);
        let first = match flattened.first() {
            Some(first) => first,
            None => return NextStepDecision::none(ResolveStatus::EmptyLine),
        };

        let current_id = match layer.current_step_id() {
            Some(id) if !id.is_empty() => id,
            _ => {
                return NextStepDecision {
                    next: Some(NextStep::from_located(first, true)),
                    status: ResolveStatus::Started,
                };
            }
        };

        let current = match locate(&flattened, current_id) {
            Some(current) => current,
            None => {
                warn!(
                    layer_id = %layer.id,
                    production_line_id = %line.id,
                    stale_step_id = %current_id,
                    "当前工序不在产线定义中，回退到首工序"
                );
                return NextStepDecision {
                    next: Some(NextStep::from_located(first, true)),
                    status: ResolveStatus::FallbackToFirst {
                        stale_step_id: current_id.to_string(),
                    },
                };
            }
        };

        match flattened.get(current.global_index + 1) {
            Some(next) => NextStepDecision {
                next: Some(NextStep::from_located(
                    next,
                    next.micro_line_index != current.micro_line_index,
                )),
                status: ResolveStatus::Advanced,
            },
            None => NextStepDecision::none(ResolveStatus::Completed),
        }
    }

    /// 仅返回下一工序（None = 完成/无法决策）
    pub fn next_step(&self, layer: &ProductLayer) -> Option<NextStep> {
        self.resolve(layer).next
    }
}

impl Default for NextStepResolver {
    fn default() -> Self {
        Self::new()
    }
}
