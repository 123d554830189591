// ==========================================
// 玻璃深加工生产执行系统 - 优化队列过滤器
// ==========================================
// 职责: 选出当前停留在优化工序的玻璃层，按投产日期升序
// 说明: 按 StepRole::Optimizer 判定（未声明角色时由工序名 "optimizer" 推断）
// 红线: 只读投影，不修改任何玻璃层
// ==========================================

use std::cmp::Ordering;

use tracing::instrument;

use crate::domain::layer::ProductLayer;

/// 当前工序是否为优化工序（当前工序未填充时视为否）
pub fn is_awaiting_optimization(layer: &ProductLayer) -> bool {
    layer
        .resolved_current_step()
        .map(|step| step.is_optimizer())
        .unwrap_or(false)
}

/// 选出待优化玻璃层
///
/// 排序: production_date 升序（稳定排序）；无投产日期的排在最后
#[instrument(skip(all_layers), fields(total = all_layers.len()))]
pub fn select_for_optimization(all_layers: &[ProductLayer]) -> Vec<ProductLayer> {
    let mut selected: Vec<ProductLayer> = all_layers
        .iter()
        .filter(|layer| is_awaiting_optimization(layer))
        .cloned()
        .collect();

    selected.sort_by(|a, b| match (a.production_date, b.production_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    selected
}
