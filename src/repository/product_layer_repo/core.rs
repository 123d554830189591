use crate::domain::layer::ProductLayer;
use crate::domain::reference::normalize_id;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// ProductLayerRepository - 玻璃层仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ProductLayerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductLayerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入玻璃层
    ///
    /// # 错误
    /// - `UniqueConstraintViolation`: production_code 重复
    /// - `ForeignKeyViolation`: 产线或当前工序不存在
    pub fn insert(&self, layer: &ProductLayer) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO product_layer (
                layer_id, production_code, glass_json, treatments_json,
                width_mm, height_mm, quantity, product_id, invoice_json,
                production_line_id, production_date, current_step_id,
                current_inventory_id, production_notes, design_number, revision
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                normalize_id(&layer.id),
                layer.production_code.trim(),
                layer.glass.as_ref().map(serde_json::to_string).transpose()?,
                serde_json::to_string(&layer.treatments)?,
                layer.width_mm,
                layer.height_mm,
                layer.quantity,
                layer.product_id,
                layer.invoice.as_ref().map(serde_json::to_string).transpose()?,
                layer.production_line_id(),
                layer.production_date.map(|d| d.format("%Y-%m-%d").to_string()),
                layer.current_step_id(),
                layer.current_inventory,
                layer.production_notes,
                layer.design_number,
                layer.revision,
            ],
        )?;

        Ok(())
    }

    /// 条件推进当前工序
    ///
    /// # 并发控制
    /// 仅当 current_step_id 与 revision 均与调用方观察到的一致时更新，revision + 1
    ///
    /// # 返回
    /// - Ok(new_revision)
    ///
    /// # 错误
    /// - `NotFound`: 玻璃层不存在
    /// - `StalePosition`: 当前工序已被其他工位推进
    /// - `OptimisticLockFailure`: 工序相同但 revision 已变化
    pub fn advance(
        &self,
        layer_id: &str,
        expected_step_id: Option<&str>,
        expected_revision: i32,
        next_step_id: &str,
    ) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;
        let layer_id = normalize_id(layer_id);
        let expected_step_id = expected_step_id.map(normalize_id);

        let rows_affected = conn.execute(
            r#"
            UPDATE product_layer
               SET current_step_id = ?, revision = revision + 1, updated_at = datetime('now')
             WHERE layer_id = ? AND current_step_id IS ? AND revision = ?
            "#,
            params![normalize_id(next_step_id), layer_id, expected_step_id, expected_revision],
        )?;

        if rows_affected == 1 {
            return Ok(expected_revision + 1);
        }

        // 判断是记录不存在、位置变化还是 revision 冲突
        let actual: Option<(Option<String>, i32)> = conn
            .query_row(
                "SELECT current_step_id, revision FROM product_layer WHERE layer_id = ?",
                params![layer_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match actual {
            None => Err(RepositoryError::NotFound {
                entity: "ProductLayer".to_string(),
                id: layer_id.to_string(),
            }),
            Some((actual_step, _)) if actual_step.as_deref() != expected_step_id => {
                Err(RepositoryError::StalePosition {
                    layer_id: layer_id.to_string(),
                    expected: expected_step_id.map(str::to_string),
                    actual: actual_step,
                })
            }
            Some((_, actual_revision)) => Err(RepositoryError::OptimisticLockFailure {
                layer_id: layer_id.to_string(),
                expected: expected_revision,
                actual: actual_revision,
            }),
        }
    }

    /// 重新分配暂存库位
    pub fn assign_inventory(
        &self,
        layer_id: &str,
        inventory_id: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE product_layer
               SET current_inventory_id = ?, revision = revision + 1, updated_at = datetime('now')
             WHERE layer_id = ?
            "#,
            params![inventory_id.map(normalize_id), normalize_id(layer_id)],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductLayer".to_string(),
                id: layer_id.to_string(),
            });
        }
        Ok(())
    }
}
