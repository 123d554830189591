// ==========================================
// 玻璃深加工生产执行系统 - 产线定义模型
// ==========================================
// 结构: ProductionLine → [MicroLineRef(order)] → MicroLine → [StepRef(order)] → Step
// 红线: 同一层级内 order 不允许重复（写入时校验）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::reference::{Identified, Ref};
use crate::domain::treatment::Treatment;
use crate::domain::types::{StepRole, StepType};

/// 约定的优化工序名称（角色未显式声明时用于推断）
pub const OPTIMIZER_STEP_NAME: &str = "optimizer";

// ==========================================
// Step - 工序
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub step_type: StepType,
    #[serde(default)]
    pub role: Option<StepRole>,
    #[serde(default)]
    pub requires_scan: bool,
    #[serde(default)]
    pub handles_treatments: Vec<Ref<Treatment>>,
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
}

impl Identified for Step {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Step {
    pub fn new(id: &str, code: &str, name: &str, step_type: StepType) -> Self {
        Self {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            step_type,
            role: None,
            requires_scan: false,
            handles_treatments: Vec::new(),
            password_hash: None,
        }
    }

    pub fn with_role(mut self, role: StepRole) -> Self {
        self.role = Some(role);
        self
    }

    /// 工序角色: 显式声明优先，否则按名称/类型推断
    pub fn role(&self) -> StepRole {
        if let Some(role) = self.role {
            return role;
        }
        if self.name.trim().eq_ignore_ascii_case(OPTIMIZER_STEP_NAME) {
            StepRole::Optimizer
        } else if self.step_type == StepType::Shelf {
            StepRole::Holding
        } else {
            StepRole::Standard
        }
    }

    pub fn is_optimizer(&self) -> bool {
        self.role() == StepRole::Optimizer
    }

    /// 该工序是否能执行指定处理
    pub fn handles(&self, treatment_id: &str) -> bool {
        self.handles_treatments.iter().any(|t| t.matches(treatment_id))
    }
}

// ==========================================
// MicroLine - 微产线（可复用的工序序列）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRef {
    pub step: Ref<Step>,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroLine {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepRef>,
}

impl Identified for MicroLine {
    fn id(&self) -> &str {
        &self.id
    }
}

impl MicroLine {
    pub fn new(id: &str, code: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: impl Into<Ref<Step>>, order: i32) -> Self {
        self.steps.push(StepRef {
            step: step.into(),
            order,
        });
        self
    }

    /// 校验工序 order 不重复
    ///
    /// # 返回
    /// - Err(order): 第一个重复的 order 值
    pub fn validate_orders(&self) -> Result<(), i32> {
        first_duplicate(self.steps.iter().map(|s| s.order))
    }
}

// ==========================================
// ProductionLine - 产线
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroLineRef {
    pub micro_line: Ref<MicroLine>,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionLine {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub micro_lines: Vec<MicroLineRef>,
}

impl Identified for ProductionLine {
    fn id(&self) -> &str {
        &self.id
    }
}

impl ProductionLine {
    pub fn new(id: &str, code: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            micro_lines: Vec::new(),
        }
    }

    pub fn with_micro_line(mut self, micro_line: impl Into<Ref<MicroLine>>, order: i32) -> Self {
        self.micro_lines.push(MicroLineRef {
            micro_line: micro_line.into(),
            order,
        });
        self
    }

    /// 校验微产线 order 不重复
    pub fn validate_orders(&self) -> Result<(), i32> {
        first_duplicate(self.micro_lines.iter().map(|m| m.order))
    }
}

fn first_duplicate(orders: impl Iterator<Item = i32>) -> Result<(), i32> {
    let mut seen = std::collections::HashSet::new();
    for order in orders {
        if !seen.insert(order) {
            return Err(order);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_inferred_from_name() {
        let step = Step::new("s1", "OPT", "Optimizer", StepType::Step);
        assert_eq!(step.role(), StepRole::Optimizer);

        let shelf = Step::new("s2", "SH", "Rack A", StepType::Shelf);
        assert_eq!(shelf.role(), StepRole::Holding);

        let cut = Step::new("s3", "CUT", "Cutting", StepType::Step);
        assert_eq!(cut.role(), StepRole::Standard);
    }

    #[test]
    fn test_explicit_role_wins() {
        let step =
            Step::new("s1", "NEST", "Nesting", StepType::Step).with_role(StepRole::Optimizer);
        assert!(step.is_optimizer());

        let renamed =
            Step::new("s2", "OPT", "optimizer", StepType::Step).with_role(StepRole::Standard);
        assert!(!renamed.is_optimizer());
    }

    #[test]
    fn test_duplicate_orders_rejected() {
        let ml = MicroLine::new("m1", "A", "A")
            .with_step(Ref::Id("s1".to_string()), 1)
            .with_step(Ref::Id("s2".to_string()), 1);
        assert_eq!(ml.validate_orders(), Err(1));

        let line = ProductionLine::new("l1", "L1", "Line")
            .with_micro_line(Ref::Id("m1".to_string()), 1)
            .with_micro_line(Ref::Id("m2".to_string()), 2);
        assert!(line.validate_orders().is_ok());
    }

    #[test]
    fn test_id_only_step_reference_stays_bare() {
        let step_ref: StepRef = serde_json::from_str(r#"{"step":{"_id":"s2"},"order":1}"#).unwrap();
        assert_eq!(step_ref.step, Ref::Id("s2".to_string()));

        let line: ProductionLine = serde_json::from_str(r#"{"_id":"l1"}"#).unwrap();
        assert!(line.code.is_empty());
        assert!(line.micro_lines.is_empty());
    }
}
