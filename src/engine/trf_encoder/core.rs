use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

use super::fields::TrfLine;
use super::rules::{
    classify_layer, color_name, customer_fields, group_kind, grouping_key, legacy_date_field,
    scaled_dimension, weekday_color_id,
};
use super::{TrfError, TRF_RELEASE};
use crate::domain::layer::ProductLayer;
use crate::domain::types::LayerKind;

// ===== 字段宽度 =====
const REL_RELEASE: usize = 8;

const ORD_ORDER_NO: usize = 12;
const ORD_CUSTOMER_NO: usize = 10;
const ORD_CUSTOMER_NAME: usize = 30;
const ORD_TEXT1: usize = 30;
const ORD_TEXT2: usize = 10;
const ORD_DATE: usize = 10;
const ORD_DELIVERY_AREA: usize = 12;

const POS_ITEM_NO: usize = 5;
const POS_ID: usize = 12;
const POS_QTY: usize = 5;
const POS_DIMENSION: usize = 6;
const POS_KIND: usize = 10;
const POS_BARCODE: usize = 20;

const TXT_NOTES: usize = 40;
const TXT_TREATMENTS: usize = 60;

const SHP_DESIGN: usize = 20;

const GL1_CODE: usize = 12;
const GL1_NAME: usize = 30;
const GL1_THICKNESS: usize = 6;

const DEFAULT_ITEM_ID: &str = "ID";

/// TRF 导出结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrfDocument {
    pub content: String,
    pub file_name: String,
    pub order_count: usize,
    pub layer_count: usize,
}

/// 文件名: LISEC-{yyyyMMdd-HHmmss-SSS}.TRF
pub fn trf_file_name(now: NaiveDateTime) -> String {
    format!("LISEC-{}.TRF", now.format("%Y%m%d-%H%M%S-%3f"))
}

// ==========================================
// TrfEncoder - TRF 编码器
// ==========================================
pub struct TrfEncoder {
    release: String,
}

impl TrfEncoder {
    pub fn new() -> Self {
        Self {
            release: TRF_RELEASE.to_string(),
        }
    }

    /// 编码（允许"未提供"输入，对应外部请求中缺失的 layers 字段）
    pub fn encode_selection(
        &self,
        layers: Option<&[ProductLayer]>,
        now: NaiveDateTime,
    ) -> Result<TrfDocument, TrfError> {
        match layers {
            Some(layers) => self.encode(layers, now),
            None => Err(TrfError::MissingBatch),
        }
    }

    /// 编码一批玻璃层
    ///
    /// # 参数
    /// - layers: 选中的玻璃层（非空）
    /// - now: 生成时刻（文件名；缺失投产日期时的日期来源）
    ///
    /// # 确定性
    /// 相同输入 + 相同 now → content 逐字节相同
    #[instrument(skip(self, layers), fields(count = layers.len()))]
    pub fn encode(
        &self,
        layers: &[ProductLayer],
        now: NaiveDateTime,
    ) -> Result<TrfDocument, TrfError> {
        if layers.is_empty() {
            return Err(TrfError::EmptyBatch);
        }

        let groups = group_layers(layers);

        let mut content = String::new();
        TrfLine::new("REL")
            .field(&self.release, REL_RELEASE)
            .write_to(&mut content);

        for (key, members) in &groups {
            self.write_order(&mut content, key, members, now);
        }

        let document = TrfDocument {
            content,
            file_name: trf_file_name(now),
            order_count: groups.len(),
            layer_count: layers.len(),
        };

        info!(
            file_name = %document.file_name,
            orders = document.order_count,
            layers = document.layer_count,
            "TRF 文件已生成"
        );
        Ok(document)
    }

    fn write_order(
        &self,
        content: &mut String,
        key: &str,
        members: &[&ProductLayer],
        now: NaiveDateTime,
    ) {
        let kinds: Vec<LayerKind> = members.iter().map(|l| classify_layer(l)).collect();
        let first = members[0];

        let date = first.production_date.unwrap_or_else(|| now.date());
        let date_field = legacy_date_field(date);
        let (customer_no, customer_name) = customer_fields(first);

        TrfLine::new("ORD")
            .field(&first.production_code, ORD_ORDER_NO)
            .field(&customer_no, ORD_CUSTOMER_NO)
            .field(&customer_name, ORD_CUSTOMER_NAME)
            .field(key, ORD_TEXT1)
            .field(group_kind(&kinds), ORD_TEXT2)
            .field(&date_field, ORD_DATE)
            .field(&date_field, ORD_DATE)
            .field(color_name(weekday_color_id(date)), ORD_DELIVERY_AREA)
            .write_to(content);

        for (index, (layer, kind)) in members.iter().zip(kinds.iter()).enumerate() {
            write_position(content, index + 1, layer, *kind);
        }
    }
}

impl Default for TrfEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// 按分组键聚合（分组顺序 = 首次出现顺序；组内按 production_code 升序）
fn group_layers(layers: &[ProductLayer]) -> Vec<(String, Vec<&ProductLayer>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&ProductLayer>)> = Vec::new();

    for layer in layers {
        let key = grouping_key(layer);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(layer),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![layer]));
            }
        }
    }

    for (_, members) in groups.iter_mut() {
        members.sort_by(|a, b| a.production_code.cmp(&b.production_code));
    }
    groups
}

fn write_position(content: &mut String, item_no: usize, layer: &ProductLayer, kind: LayerKind) {
    let glass = layer.resolved_glass();
    let item_id = glass
        .map(|g| g.code.trim())
        .filter(|code| !code.is_empty())
        .unwrap_or(DEFAULT_ITEM_ID);
    let quantity = layer.quantity.unwrap_or(1);

    TrfLine::new("POS")
        .field(&item_no.to_string(), POS_ITEM_NO)
        .field(item_id, POS_ID)
        .field(&quantity.to_string(), POS_QTY)
        .field(&scaled_dimension(layer.width_mm, kind), POS_DIMENSION)
        .field(&scaled_dimension(layer.height_mm, kind), POS_DIMENSION)
        .field(kind.as_str(), POS_KIND)
        .field(&layer.production_code, POS_BARCODE)
        .write_to(content);

    let treatments = layer
        .treatments
        .iter()
        .map(|t| format!("{}:{}", t.display_code(), t.count))
        .collect::<Vec<_>>()
        .join(",");

    TrfLine::new("TXT")
        .field(layer.production_notes.as_deref().unwrap_or(""), TXT_NOTES)
        .field(&treatments, TXT_TREATMENTS)
        .write_to(content);

    if let Some(design) = layer.design_number.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        TrfLine::new("SHP").field(design, SHP_DESIGN).write_to(content);
    }

    if let Some(glass) = glass {
        let thickness = glass.thickness_mm.map(|t| t.to_string()).unwrap_or_default();
        TrfLine::new("GL1")
            .field(&glass.code, GL1_CODE)
            .field(&glass.name, GL1_NAME)
            .field(&thickness, GL1_THICKNESS)
            .write_to(content);
    }
}
