// ==========================================
// 玻璃深加工生产执行系统 - 加工处理 (Treatment)
// ==========================================
// 例: 钢化、夹胶、水刀切割、磨边
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::reference::{Identified, Ref};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl Identified for Treatment {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Treatment {
    pub fn new(id: &str, code: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
        }
    }

    /// code 或 name 与给定标签相同（忽略大小写）
    pub fn is_labeled(&self, label: &str) -> bool {
        self.code.trim().eq_ignore_ascii_case(label) || self.name.trim().eq_ignore_ascii_case(label)
    }
}

// ==========================================
// TreatmentApplication - 玻璃层上的一次加工处理
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentApplication {
    pub treatment: Ref<Treatment>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub measurement: Option<f64>,
}

fn default_count() -> u32 {
    1
}

impl TreatmentApplication {
    pub fn new(treatment: Treatment, count: u32) -> Self {
        Self {
            treatment: Ref::Resolved(treatment),
            count,
            measurement: None,
        }
    }

    /// 展示用代码: 优先 code，其次 name，未填充时为 ID
    pub fn display_code(&self) -> String {
        match self.treatment.resolved() {
            Some(t) if !t.code.trim().is_empty() => t.code.trim().to_string(),
            Some(t) if !t.name.trim().is_empty() => t.name.trim().to_string(),
            _ => self.treatment.id().to_string(),
        }
    }
}
