use super::core::ProductLayerRepository;
use crate::domain::layer::ProductLayer;
use crate::domain::reference::{normalize_id, Ref};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT layer_id, production_code, glass_json, treatments_json,
           width_mm, height_mm, quantity, product_id, invoice_json,
           production_line_id, production_date, current_step_id,
           current_inventory_id, production_notes, design_number, revision
    FROM product_layer
"#;

impl ProductLayerRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, layer_id: &str) -> RepositoryResult<Option<ProductLayer>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE layer_id = ?", SELECT_COLUMNS);
        let layer = conn
            .query_row(&sql, params![normalize_id(layer_id)], map_row)
            .optional()?;
        Ok(layer)
    }

    /// 按条码编号查询（扫码入口）
    pub fn find_by_production_code(
        &self,
        production_code: &str,
    ) -> RepositoryResult<Option<ProductLayer>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE production_code = ?", SELECT_COLUMNS);
        let layer = conn
            .query_row(&sql, params![production_code.trim()], map_row)
            .optional()?;
        Ok(layer)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<ProductLayer>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY production_code", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let layers = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(layers)
    }

    /// 查询停留在指定工序的玻璃层
    pub fn list_by_current_step(&self, step_id: &str) -> RepositoryResult<Vec<ProductLayer>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE current_step_id = ? ORDER BY production_code", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let layers = stmt
            .query_map(params![normalize_id(step_id)], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(layers)
    }
}

// ==========================================
// 行映射
// ==========================================

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> SqliteResult<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) if !s.trim().is_empty() => serde_json::from_str(&s)
            .map(Some)
            .map_err(|e| conversion_failure(idx, Box::new(e))),
        _ => Ok(None),
    }
}

/// 投产日期列（%Y-%m-%d）; 格式错误视为数据损坏
fn date_column(row: &Row, idx: usize) -> SqliteResult<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|e| conversion_failure(idx, Box::new(e))),
        _ => Ok(None),
    }
}

fn conversion_failure(
    idx: usize,
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, source)
}

fn map_row(row: &Row) -> SqliteResult<ProductLayer> {
    let production_line_id: Option<String> = row.get(9)?;
    let current_step_id: Option<String> = row.get(11)?;

    Ok(ProductLayer {
        id: row.get(0)?,
        production_code: row.get(1)?,
        glass: json_column(row, 2)?,
        treatments: json_column(row, 3)?.unwrap_or_default(),
        width_mm: row.get(4)?,
        height_mm: row.get(5)?,
        quantity: row.get(6)?,
        product_id: row.get(7)?,
        invoice: json_column(row, 8)?,
        production_line: production_line_id.map(Ref::Id),
        production_date: date_column(row, 10)?,
        current_step: current_step_id.map(Ref::Id),
        current_inventory: row.get(12)?,
        production_notes: row.get(13)?,
        design_number: row.get(14)?,
        revision: row.get(15)?,
    })
}
