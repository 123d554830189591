// ==========================================
// 玻璃深加工生产执行系统 - 工序执行记录数据仓储
// ==========================================
// 表: step_execution
// 红线: 只追加; 不提供 update / delete
// ==========================================

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

use crate::domain::reference::normalize_id;
use crate::domain::step_execution::StepExecution;
use crate::domain::types::ExecutionPhase;
use crate::engine::step_recorder::StepExecutionStore;
use crate::repository::error::{RepositoryError, RepositoryResult};

const SELECT_COLUMNS: &str = r#"
    SELECT execution_id, layer_id, step_id, production_line_id, phase,
           scanned_at, treatments_json, passed, notes
    FROM step_execution
"#;

pub struct StepExecutionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StepExecutionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入执行记录
    ///
    /// # 错误
    /// - `ForeignKeyViolation`: 玻璃层 / 工序 / 产线不存在
    pub fn insert(&self, execution: &StepExecution) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO step_execution (
                execution_id, layer_id, step_id, production_line_id, phase,
                scanned_at, treatments_json, passed, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                execution.execution_id,
                normalize_id(&execution.layer_id),
                normalize_id(&execution.step_id),
                normalize_id(&execution.production_line_id),
                execution.phase.as_str(),
                execution.scanned_at,
                serde_json::to_string(&execution.treatments_applied)?,
                execution.passed,
                execution.notes,
            ],
        )?;
        Ok(())
    }

    /// 玻璃层的全部执行历史（按扫码时间升序）
    pub fn find_by_layer(&self, layer_id: &str) -> RepositoryResult<Vec<StepExecution>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE layer_id = ? ORDER BY scanned_at ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![normalize_id(layer_id)], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 某玻璃层在某工序上的执行记录（含返工重入）
    pub fn find_by_layer_and_step(
        &self,
        layer_id: &str,
        step_id: &str,
    ) -> RepositoryResult<Vec<StepExecution>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE layer_id = ? AND step_id = ? ORDER BY scanned_at ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![normalize_id(layer_id), normalize_id(step_id)], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_latest_for_layer(&self, layer_id: &str) -> RepositoryResult<Option<StepExecution>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE layer_id = ? ORDER BY scanned_at DESC, rowid DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![normalize_id(layer_id)], map_row)
            .optional()?;
        Ok(row)
    }

    pub fn count_by_layer(&self, layer_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM step_execution WHERE layer_id = ?",
            params![normalize_id(layer_id)],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl StepExecutionStore for StepExecutionRepository {
    fn append(&self, execution: &StepExecution) -> RepositoryResult<()> {
        self.insert(execution)
    }
}

fn map_row(row: &Row) -> SqliteResult<StepExecution> {
    let phase: String = row.get(4)?;
    let treatments_json: String = row.get(6)?;

    let phase = ExecutionPhase::from_str(&phase).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("未知执行阶段: {}", phase).into(),
        )
    })?;
    let treatments_applied = serde_json::from_str(&treatments_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(StepExecution {
        execution_id: row.get(0)?,
        layer_id: row.get(1)?,
        step_id: row.get(2)?,
        production_line_id: row.get(3)?,
        phase,
        scanned_at: row.get(5)?,
        treatments_applied,
        passed: row.get(7)?,
        notes: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layer::ProductLayer;
    use crate::domain::production_line::{MicroLine, ProductionLine, Step};
    use crate::domain::reference::Ref;
    use crate::domain::step_execution::StepExecutionDraft;
    use crate::domain::types::StepType;
    use crate::engine::step_recorder::StepRecorder;
    use crate::repository::product_layer_repo::ProductLayerRepository;
    use crate::repository::production_line_repo::ProductionLineRepository;
    use chrono::NaiveDate;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let lines = ProductionLineRepository::new(conn.clone());
        lines.insert_step(&Step::new("s1", "CUT", "Cutting", StepType::Step)).unwrap();
        lines
            .insert_micro_line(
                &MicroLine::new("m1", "M1", "Cutting").with_step(Ref::Id("s1".to_string()), 1),
            )
            .unwrap();
        lines
            .insert_production_line(
                &ProductionLine::new("l1", "L1", "Line 1")
                    .with_micro_line(Ref::Id("m1".to_string()), 1),
            )
            .unwrap();
        ProductLayerRepository::new(conn.clone())
            .insert(&ProductLayer::new("layer1", "P-001", 1000.0, 500.0))
            .unwrap();
        conn
    }

    fn at(h: u32, m: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_history_is_chronological_and_append_only() {
        let conn = setup_test_db();
        let repo = Arc::new(StepExecutionRepository::new(conn));
        let recorder = StepRecorder::new(repo.clone());

        recorder
            .record(StepExecutionDraft::new("layer1", "s1", "l1", true).at(at(9, 0)))
            .unwrap();
        recorder
            .record(StepExecutionDraft::new("layer1", "s1", "l1", false).at(at(8, 0)))
            .unwrap();
        // 同一 (layer, step) 返工重入
        recorder
            .record(StepExecutionDraft::new("layer1", "s1", "l1", true).at(at(10, 0)))
            .unwrap();

        let history = repo.find_by_layer("layer1").unwrap();
        let times: Vec<_> = history.iter().map(|e| e.scanned_at).collect();
        assert_eq!(times, vec![at(8, 0), at(9, 0), at(10, 0)]);
        assert_eq!(history[0].phase, ExecutionPhase::Entered);

        assert_eq!(repo.find_by_layer_and_step("layer1", "s1").unwrap().len(), 3);
        assert_eq!(repo.count_by_layer("layer1").unwrap(), 3);
        let latest = repo.find_latest_for_layer("layer1").unwrap().unwrap();
        assert_eq!(latest.scanned_at, at(10, 0));
    }

    #[test]
    fn test_unknown_references_rejected_without_partial_record() {
        let conn = setup_test_db();
        let repo = Arc::new(StepExecutionRepository::new(conn));
        let recorder = StepRecorder::new(repo.clone());

        let err = recorder
            .record(StepExecutionDraft::new("ghost", "s1", "l1", true))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
        assert_eq!(repo.count_by_layer("ghost").unwrap(), 0);
    }
}
