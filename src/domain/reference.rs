// ==========================================
// 玻璃深加工生产执行系统 - 引用类型
// ==========================================
// 职责: 统一"裸 ID"与"已填充对象"两种引用形态
// 红线: 所有 ID 比较必须经过 normalize_id
// ==========================================

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 可提供稳定标识的实体
pub trait Identified {
    fn id(&self) -> &str;
}

/// 标识归一化（去除首尾空白）
///
/// 定位器、解析器、队列过滤器、仓储统一使用此函数比较 ID
pub fn normalize_id(raw: &str) -> &str {
    raw.trim()
}

/// 两个标识是否相同（归一化后比较）
pub fn same_id(a: &str, b: &str) -> bool {
    normalize_id(a) == normalize_id(b)
}

// ==========================================
// Ref<T> - 引用（ID 或已填充实体）
// ==========================================
// JSON 形态: "abc123"、{ "_id": "abc123" } 或 { "id": "abc123", ... }
// 仅含 _id / id 的对象视为裸 ID（未填充）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(String),
    Resolved(T),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Ref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(id) => Ok(Ref::Id(id)),
            Value::Object(map) => match bare_id(&map) {
                Some(id) => Ok(Ref::Id(id.to_string())),
                None => serde_json::from_value(Value::Object(map))
                    .map(Ref::Resolved)
                    .map_err(D::Error::custom),
            },
            other => Err(D::Error::custom(format!(
                "引用必须是字符串或对象, 实际为: {}",
                other
            ))),
        }
    }
}

/// 对象只携带标识字段时返回该标识
fn bare_id(map: &Map<String, Value>) -> Option<&str> {
    if map.is_empty() || map.keys().any(|k| k != "_id" && k != "id") {
        return None;
    }
    map.get("_id").or_else(|| map.get("id")).and_then(Value::as_str)
}

impl<T: Identified> Ref<T> {
    /// 归一化后的标识
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => normalize_id(id),
            Ref::Resolved(entity) => normalize_id(entity.id()),
        }
    }

    /// 已填充的实体（裸 ID 返回 None）
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Resolved(entity) => Some(entity),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Ref::Resolved(_))
    }

    /// 与另一个标识比较
    pub fn matches(&self, other_id: &str) -> bool {
        same_id(self.id(), other_id)
    }
}

impl<T> From<T> for Ref<T> {
    fn from(entity: T) -> Self {
        Ref::Resolved(entity)
    }
}
