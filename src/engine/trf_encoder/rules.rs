// ==========================================
// TRF 字段推导规则
// ==========================================
// 分组键 / 客户字段 / 加工类别 / 星期颜色日期 / 尺寸补偿
// ==========================================

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::layer::ProductLayer;
use crate::domain::types::LayerKind;

/// 标准原片尺寸白名单 (mm)
pub const STANDARD_SHEET_SIZES_MM: [u32; 18] = [
    1100, 1125, 1250, 1605, 1800, 1900, 2000, 2100, 2200, 2250, 2400, 2500, 2600, 3000, 3180,
    3195, 3200, 3210,
];

/// 非标尺寸补偿量 (mm)
pub const DIMENSION_BUMP_MM: f64 = 1.0;

/// 星期名称表（下标 0 不用，旧系统从 Saturday 开始排列）
pub const WEEKDAY_COLOR_NAMES: [&str; 8] = [
    "", "SATURDAY", "SUNDAY", "MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY",
];

/// 旧系统日期字段的固定月/年占位
const LEGACY_DATE_SUFFIX: &str = "/01/2009";

const DEFAULT_CUSTOMER_NO: &str = "CUST001";
const DEFAULT_CUSTOMER_NAME: &str = "Unknown";

// ==========================================
// 分组键
// ==========================================

/// 订单分组键
///
/// 优先级: invoice.code → invoice.id → grp-{product_id}-{YYYYMMDD}
pub fn grouping_key(layer: &ProductLayer) -> String {
    if let Some(invoice) = &layer.invoice {
        let code = invoice
            .resolved()
            .and_then(|inv| inv.code.as_deref())
            .map(str::trim)
            .unwrap_or("");
        if !code.is_empty() {
            return code.to_string();
        }
        if !invoice.id().is_empty() {
            return invoice.id().to_string();
        }
    }

    let product_id = layer.product_id.as_deref().map(str::trim).unwrap_or("");
    let date = layer
        .production_date
        .map(|d| d.format("%Y%m%d").to_string())
        .unwrap_or_default();
    format!("grp-{}-{}", product_id, date)
}

/// 客户编号与名称（缺失时使用旧系统默认值）
pub fn customer_fields(layer: &ProductLayer) -> (String, String) {
    let customer = layer.resolved_invoice().and_then(|inv| inv.customer.as_ref());

    let (no, name) = match customer {
        Some(customer_ref) => match customer_ref.resolved() {
            Some(c) => (
                c.code.clone().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| c.id.clone()),
                c.name.clone().filter(|s| !s.trim().is_empty()),
            ),
            None => (customer_ref.id().to_string(), None),
        },
        None => (String::new(), None),
    };

    let no = if no.trim().is_empty() {
        DEFAULT_CUSTOMER_NO.to_string()
    } else {
        no.trim().to_string()
    };
    let name = name.unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string());
    (no, name)
}

// ==========================================
// 加工类别
// ==========================================

fn has_treatment(layer: &ProductLayer, label: &str) -> bool {
    layer
        .treatments
        .iter()
        .filter_map(|t| t.treatment.resolved())
        .any(|t| t.is_labeled(label))
}

/// 单层类别: WATERJET 优先于 OJRATI，否则 NORMAL
pub fn classify_layer(layer: &ProductLayer) -> LayerKind {
    if has_treatment(layer, LayerKind::Waterjet.as_str()) {
        LayerKind::Waterjet
    } else if has_treatment(layer, LayerKind::Ojrati.as_str()) {
        LayerKind::Ojrati
    } else {
        LayerKind::Normal
    }
}

/// 订单级类别（<ORD> text2）：成员中任一 WATERJET → "WATERJET"，否则任一 OJRATI → "OJRATI"，否则空
pub fn group_kind(kinds: &[LayerKind]) -> &'static str {
    if kinds.contains(&LayerKind::Waterjet) {
        LayerKind::Waterjet.as_str()
    } else if kinds.contains(&LayerKind::Ojrati) {
        LayerKind::Ojrati.as_str()
    } else {
        ""
    }
}

// ==========================================
// 星期颜色日期
// ==========================================

/// 星期颜色编号: 周日 → 2，其余 → (周日起算下标 + 1)
///
/// 永远不会产生 1，下游设备依赖此映射，保持原样
pub fn weekday_color_id(date: NaiveDate) -> u32 {
    match date.weekday() {
        Weekday::Sun => 2,
        other => other.num_days_from_sunday() + 1,
    }
}

/// 颜色名称（按编号查星期名称表）
pub fn color_name(color_id: u32) -> &'static str {
    WEEKDAY_COLOR_NAMES
        .get(color_id as usize)
        .copied()
        .unwrap_or("")
}

/// 生产/交货日期字段: "{颜色编号:02}/01/2009"（不是真实日期）
pub fn legacy_date_field(date: NaiveDate) -> String {
    format!("{:02}{}", weekday_color_id(date), LEGACY_DATE_SUFFIX)
}

// ==========================================
// 尺寸
// ==========================================

pub fn is_standard_size(mm: f64) -> bool {
    STANDARD_SHEET_SIZES_MM
        .iter()
        .any(|&size| (f64::from(size) - mm).abs() < f64::EPSILON)
}

/// 输出尺寸（0.1mm 单位）
///
/// NORMAL / WATERJET 且非标准尺寸 → +1mm 后 ×10；OJRATI 或标准尺寸 → 直接 ×10
pub fn scaled_dimension(mm: f64, kind: LayerKind) -> String {
    let bumped = match kind {
        LayerKind::Normal | LayerKind::Waterjet if !is_standard_size(mm) => mm + DIMENSION_BUMP_MM,
        _ => mm,
    };
    format!("{}", (bumped * 10.0).round() as i64)
}
