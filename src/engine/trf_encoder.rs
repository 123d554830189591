// ==========================================
// 玻璃深加工生产执行系统 - LISEC TRF 导出编码器
// ==========================================
// 职责: 将选中的玻璃层编码为 LISEC 优化机可读取的 TRF 平面文件
// 记录: <REL> <ORD> <POS> <TXT> <SHP> <GL1>，定宽字段，CRLF 换行
// 红线: 必须逐字段复现旧版生成器行为（含日期占位、尺寸补偿）
// 红线: 缺失的可选关联一律降级为默认值，只有空批次报错
// ==========================================

mod core;
mod fields;
mod rules;

#[cfg(test)]
mod tests;

pub use self::core::{trf_file_name, TrfDocument, TrfEncoder};
pub use self::fields::{fixed_width, TrfLine};
pub use self::rules::{
    classify_layer, color_name, customer_fields, grouping_key, group_kind, is_standard_size,
    legacy_date_field, scaled_dimension, weekday_color_id, DIMENSION_BUMP_MM,
    STANDARD_SHEET_SIZES_MM, WEEKDAY_COLOR_NAMES,
};

use thiserror::Error;

/// TRF 版本号（<REL> 记录）
pub const TRF_RELEASE: &str = "2.10";

/// TRF 编码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrfError {
    #[error("未提供玻璃层列表")]
    MissingBatch,

    #[error("玻璃层列表为空")]
    EmptyBatch,
}
