// ==========================================
// 玻璃深加工生产执行系统 - 玻璃层 (ProductLayer)
// ==========================================
// 一块物理切片 = 一条 ProductLayer
// 生命周期: 订单投产时创建 → 每次工序流转覆盖 current_step
//           → 管理员终结删除
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::production_line::{ProductionLine, Step};
use crate::domain::reference::{Identified, Ref};
use crate::domain::treatment::TreatmentApplication;

// ==========================================
// Glass - 原片玻璃
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glass {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub thickness_mm: Option<f64>,
}

impl Identified for Glass {
    fn id(&self) -> &str {
        &self.id
    }
}

// ==========================================
// Invoice / Customer - 订单与客户
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Identified for Customer {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub customer: Option<Ref<Customer>>,
}

impl Identified for Invoice {
    fn id(&self) -> &str {
        &self.id
    }
}

// ==========================================
// ProductLayer - 玻璃层
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLayer {
    #[serde(alias = "_id")]
    pub id: String,
    /// 条码可见编号
    pub production_code: String,
    #[serde(default)]
    pub glass: Option<Ref<Glass>>,
    #[serde(default)]
    pub treatments: Vec<TreatmentApplication>,
    pub width_mm: f64,
    pub height_mm: f64,
    /// 当前数据模型无数量字段，缺省为 1
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub invoice: Option<Ref<Invoice>>,
    #[serde(default)]
    pub production_line: Option<Ref<ProductionLine>>,
    #[serde(default)]
    pub production_date: Option<NaiveDate>,
    /// None = 尚未开始
    #[serde(default)]
    pub current_step: Option<Ref<Step>>,
    /// 暂存库位
    #[serde(default)]
    pub current_inventory: Option<String>,
    #[serde(default)]
    pub production_notes: Option<String>,
    #[serde(default)]
    pub design_number: Option<String>,
    /// 乐观锁版本
    #[serde(default)]
    pub revision: i32,
}

impl Identified for ProductLayer {
    fn id(&self) -> &str {
        &self.id
    }
}

impl ProductLayer {
    /// 创建新的玻璃层（未开始）
    pub fn new(id: &str, production_code: &str, width_mm: f64, height_mm: f64) -> Self {
        Self {
            id: id.to_string(),
            production_code: production_code.to_string(),
            glass: None,
            treatments: Vec::new(),
            width_mm,
            height_mm,
            quantity: None,
            product_id: None,
            invoice: None,
            production_line: None,
            production_date: None,
            current_step: None,
            current_inventory: None,
            production_notes: None,
            design_number: None,
            revision: 0,
        }
    }

    pub fn current_step_id(&self) -> Option<&str> {
        self.current_step.as_ref().map(|s| s.id())
    }

    pub fn production_line_id(&self) -> Option<&str> {
        self.production_line.as_ref().map(|l| l.id())
    }

    /// 已填充的当前工序
    pub fn resolved_current_step(&self) -> Option<&Step> {
        self.current_step.as_ref().and_then(|s| s.resolved())
    }

    pub fn resolved_glass(&self) -> Option<&Glass> {
        self.glass.as_ref().and_then(|g| g.resolved())
    }

    pub fn resolved_invoice(&self) -> Option<&Invoice> {
        self.invoice.as_ref().and_then(|i| i.resolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_only_current_step_deserializes() {
        let json = r#"{
            "_id": "layer1",
            "production_code": "P-001",
            "width_mm": 1000.0,
            "height_mm": 2000.0,
            "production_line": {"_id": "l1", "name": "Line 1"},
            "current_step": {"_id": "s2"}
        }"#;
        let layer: ProductLayer = serde_json::from_str(json).unwrap();

        assert_eq!(layer.current_step_id(), Some("s2"));
        assert!(layer.resolved_current_step().is_none());
        assert_eq!(layer.production_line_id(), Some("l1"));
        assert!(layer.production_line.as_ref().unwrap().is_resolved());
        assert_eq!(layer.revision, 0);
    }
}
