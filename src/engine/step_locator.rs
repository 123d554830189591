// ==========================================
// 玻璃深加工生产执行系统 - 工序定位器
// ==========================================
// 职责: 将产线图展平为全局有序的工序序列
// 规则: 先按微产线 order 升序，再按微产线内工序 order 升序（稳定排序）
// 红线: 纯函数，不做 I/O，不做引用填充
// ==========================================

use serde::Serialize;

use crate::domain::production_line::{ProductionLine, Step};
use crate::domain::reference::{same_id, Ref};

/// 展平后的工序位置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedStep {
    pub step: Ref<Step>,
    pub micro_line_id: String,
    pub micro_line_index: usize,
    pub step_index: usize,
    pub global_index: usize,
}

impl LocatedStep {
    pub fn step_id(&self) -> &str {
        self.step.id()
    }
}

/// 展平产线
///
/// 未填充的微产线（仅 ID）没有工序可贡献，直接跳过；
/// 未填充的工序保持 `Ref::Id` 原样透传。
///
/// # 返回
/// 空产线 / 全部微产线无工序 → 空列表（调用方视为"无有效位置"）
pub fn flatten(line: &ProductionLine) -> Vec<LocatedStep> {
    let mut micro_lines: Vec<_> = line.micro_lines.iter().collect();
    micro_lines.sort_by_key(|m| m.order);

    let mut located = Vec::new();
    for (micro_line_index, micro_ref) in micro_lines.into_iter().enumerate() {
        let micro_line = match micro_ref.micro_line.resolved() {
            Some(ml) => ml,
            None => continue,
        };

        let mut steps: Vec<_> = micro_line.steps.iter().collect();
        steps.sort_by_key(|s| s.order);

        for (step_index, step_ref) in steps.into_iter().enumerate() {
            located.push(LocatedStep {
                step: step_ref.step.clone(),
                micro_line_id: micro_ref.micro_line.id().to_string(),
                micro_line_index,
                step_index,
                global_index: located.len(),
            });
        }
    }

    located
}

/// 在展平序列中查找工序位置
pub fn locate<'a>(flattened: &'a [LocatedStep], step_id: &str) -> Option<&'a LocatedStep> {
    flattened.iter().find(|s| same_id(s.step_id(), step_id))
}

/// 产线是否包含指定工序
pub fn contains_step(line: &ProductionLine, step_id: &str) -> bool {
    locate(&flatten(line), step_id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::production_line::MicroLine;
    use crate::domain::types::StepType;

    fn step(id: &str) -> Step {
        Step::new(id, &id.to_uppercase(), id, StepType::Step)
    }

    #[test]
    fn test_flatten_orders_by_micro_line_then_step() {
        // 故意乱序插入
        let b = MicroLine::new("mB", "B", "B").with_step(step("s3"), 1);
        let a = MicroLine::new("mA", "A", "A")
            .with_step(step("s2"), 20)
            .with_step(step("s1"), 10);
        let line = ProductionLine::new("l1", "L1", "Line 1")
            .with_micro_line(b, 2)
            .with_micro_line(a, 1);

        let flat = flatten(&line);
        let ids: Vec<&str> = flat.iter().map(|s| s.step_id()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);

        for (i, s) in flat.iter().enumerate() {
            assert_eq!(s.global_index, i);
        }
        assert_eq!(flat[0].micro_line_index, 0);
        assert_eq!(flat[1].step_index, 1);
        assert_eq!(flat[2].micro_line_index, 1);
        assert_eq!(flat[2].micro_line_id, "mB");
    }

    #[test]
    fn test_empty_line_and_empty_micro_lines() {
        let empty = ProductionLine::new("l0", "L0", "Empty");
        assert!(flatten(&empty).is_empty());

        let hollow = ProductionLine::new("l1", "L1", "Hollow")
            .with_micro_line(MicroLine::new("m1", "M1", "M1"), 1)
            .with_micro_line(Ref::Id("m2".to_string()), 2);
        assert!(flatten(&hollow).is_empty());
    }

    #[test]
    fn test_unresolved_steps_pass_through() {
        let ml = MicroLine::new("m1", "M1", "M1").with_step(Ref::Id(" s9 ".to_string()), 1);
        let line = ProductionLine::new("l1", "L1", "L").with_micro_line(ml, 1);

        let flat = flatten(&line);
        assert_eq!(flat.len(), 1);
        assert!(!flat[0].step.is_resolved());
        assert_eq!(flat[0].step_id(), "s9");
        assert!(contains_step(&line, "s9"));
    }

    #[test]
    fn test_duplicate_orders_keep_insertion_order() {
        let ml = MicroLine::new("m1", "M1", "M1")
            .with_step(step("first"), 1)
            .with_step(step("second"), 1);
        let line = ProductionLine::new("l1", "L1", "L").with_micro_line(ml, 1);

        let ids: Vec<String> = flatten(&line).iter().map(|s| s.step_id().to_string()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }
}
