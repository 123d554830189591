// ==========================================
// 玻璃深加工生产执行系统 - 玻璃层数据仓储
// ==========================================
// 表: product_layer
// 红线: 工序推进必须走条件更新（current_step_id + revision），防止并发重复推进
// 说明: glass / invoice / treatments 以 JSON 快照存储；
//       production_line / current_step 读出为裸 ID，由 API 层填充
// ==========================================

mod core;
mod queries;


pub use self::core::ProductLayerRepository;
