// ==========================================
// 玻璃深加工生产执行系统 - 产线定义数据仓储
// ==========================================
// 表: treatment / step / step_treatment / micro_line / micro_line_step /
//     production_line / production_line_micro_line
// 红线: 写入前校验 order 不重复; 读出的产线图全部为已填充形态
// ==========================================

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use crate::domain::production_line::{MicroLine, MicroLineRef, ProductionLine, Step, StepRef};
use crate::domain::reference::{normalize_id, Ref};
use crate::domain::treatment::Treatment;
use crate::domain::types::{StepRole, StepType};
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct ProductionLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionLineRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    pub fn insert_treatment(&self, treatment: &Treatment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO treatment (treatment_id, code, name) VALUES (?, ?, ?)",
            params![normalize_id(&treatment.id), treatment.code, treatment.name],
        )?;
        Ok(())
    }

    /// 插入工序（角色按 Step::role() 落库）
    pub fn insert_step(&self, step: &Step) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO step (step_id, code, name, step_type, role, requires_scan, password_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                normalize_id(&step.id),
                step.code,
                step.name,
                step.step_type.as_str(),
                step.role().as_str(),
                step.requires_scan,
                step.password_hash,
            ],
        )?;

        for treatment in &step.handles_treatments {
            tx.execute(
                "INSERT INTO step_treatment (step_id, treatment_id) VALUES (?, ?)",
                params![normalize_id(&step.id), treatment.id()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 插入微产线及其工序顺序
    ///
    /// # 错误
    /// - `ValidationError`: 工序 order 重复
    /// - `ForeignKeyViolation`: 引用的工序不存在
    pub fn insert_micro_line(&self, micro_line: &MicroLine) -> RepositoryResult<()> {
        micro_line.validate_orders().map_err(|order| {
            RepositoryError::ValidationError(format!(
                "微产线 {} 存在重复的工序 order={}",
                micro_line.code, order
            ))
        })?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO micro_line (micro_line_id, code, name) VALUES (?, ?, ?)",
            params![normalize_id(&micro_line.id), micro_line.code, micro_line.name],
        )?;

        for step_ref in &micro_line.steps {
            tx.execute(
                "INSERT INTO micro_line_step (micro_line_id, step_id, step_order) VALUES (?, ?, ?)",
                params![normalize_id(&micro_line.id), step_ref.step.id(), step_ref.order],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 插入产线及其微产线顺序
    pub fn insert_production_line(&self, line: &ProductionLine) -> RepositoryResult<()> {
        line.validate_orders().map_err(|order| {
            RepositoryError::ValidationError(format!(
                "产线 {} 存在重复的微产线 order={}",
                line.code, order
            ))
        })?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO production_line (production_line_id, code, name) VALUES (?, ?, ?)",
            params![normalize_id(&line.id), line.code, line.name],
        )?;

        for micro_ref in &line.micro_lines {
            tx.execute(
                r#"
                INSERT INTO production_line_micro_line
                    (production_line_id, micro_line_id, line_order)
                VALUES (?, ?, ?)
                "#,
                params![normalize_id(&line.id), micro_ref.micro_line.id(), micro_ref.order],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_step(&self, step_id: &str) -> RepositoryResult<Option<Step>> {
        let conn = self.get_conn()?;
        load_step(&conn, normalize_id(step_id))
    }

    /// 查询完整填充的产线图
    pub fn find_production_line(&self, line_id: &str) -> RepositoryResult<Option<ProductionLine>> {
        let conn = self.get_conn()?;
        load_production_line(&conn, normalize_id(line_id))
    }

    pub fn find_production_line_by_code(
        &self,
        code: &str,
    ) -> RepositoryResult<Option<ProductionLine>> {
        let conn = self.get_conn()?;
        let line_id: Option<String> = conn
            .query_row(
                "SELECT production_line_id FROM production_line WHERE code = ?",
                params![code.trim()],
                |row| row.get(0),
            )
            .optional()?;

        match line_id {
            Some(id) => load_production_line(&conn, &id),
            None => Ok(None),
        }
    }

    pub fn list_production_lines(&self) -> RepositoryResult<Vec<ProductionLine>> {
        let conn = self.get_conn()?;
        let ids = {
            let mut stmt =
                conn.prepare("SELECT production_line_id FROM production_line ORDER BY code")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut lines = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(line) = load_production_line(&conn, &id)? {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}

// ==========================================
// 行映射 / 图加载
// ==========================================

fn map_step_row(row: &Row) -> rusqlite::Result<Step> {
    let step_type: String = row.get(3)?;
    let role: String = row.get(4)?;

    let step_type = StepType::from_str(&step_type)
        .ok_or_else(|| conversion_failure(3, format!("未知工序类型: {}", step_type)))?;
    // 空角色按名称/类型推断
    let role = match role.trim() {
        "" => None,
        raw => Some(
            StepRole::from_str(raw)
                .ok_or_else(|| conversion_failure(4, format!("未知工序角色: {}", raw)))?,
        ),
    };

    Ok(Step {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        step_type,
        role,
        requires_scan: row.get(5)?,
        handles_treatments: Vec::new(),
        password_hash: row.get(6)?,
    })
}

fn conversion_failure(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

fn load_step(conn: &Connection, step_id: &str) -> RepositoryResult<Option<Step>> {
    let step = conn
        .query_row(
            r#"
            SELECT step_id, code, name, step_type, role, requires_scan, password_hash
            FROM step WHERE step_id = ?
            "#,
            params![step_id],
            map_step_row,
        )
        .optional()?;

    let mut step = match step {
        Some(step) => step,
        None => return Ok(None),
    };

    let mut stmt = conn.prepare(
        r#"
        SELECT t.treatment_id, t.code, t.name
        FROM step_treatment st JOIN treatment t ON t.treatment_id = st.treatment_id
        WHERE st.step_id = ?
        ORDER BY t.code
        "#,
    )?;
    step.handles_treatments = stmt
        .query_map(params![step_id], |row| {
            Ok(Ref::Resolved(Treatment {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
            }))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(step))
}

fn load_micro_line(conn: &Connection, micro_line_id: &str) -> RepositoryResult<Option<MicroLine>> {
    let micro_line = conn
        .query_row(
            "SELECT micro_line_id, code, name FROM micro_line WHERE micro_line_id = ?",
            params![micro_line_id],
            |row| {
                Ok(MicroLine::new(
                    &row.get::<_, String>(0)?,
                    &row.get::<_, String>(1)?,
                    &row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    let mut micro_line = match micro_line {
        Some(ml) => ml,
        None => return Ok(None),
    };

    let step_orders = {
        let mut stmt = conn.prepare(
            r#"
            SELECT step_id, step_order FROM micro_line_step
            WHERE micro_line_id = ? ORDER BY step_order
            "#,
        )?;
        let rows = stmt.query_map(params![micro_line_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    for (step_id, order) in step_orders {
        let step = match load_step(conn, &step_id)? {
            Some(step) => Ref::Resolved(step),
            None => Ref::Id(step_id),
        };
        micro_line.steps.push(StepRef { step, order });
    }

    Ok(Some(micro_line))
}

fn load_production_line(
    conn: &Connection,
    line_id: &str,
) -> RepositoryResult<Option<ProductionLine>> {
    let line = conn
        .query_row(
            r#"
            SELECT production_line_id, code, name FROM production_line
            WHERE production_line_id = ?
            "#,
            params![line_id],
            |row| {
                Ok(ProductionLine::new(
                    &row.get::<_, String>(0)?,
                    &row.get::<_, String>(1)?,
                    &row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    let mut line = match line {
        Some(line) => line,
        None => return Ok(None),
    };

    let micro_orders = {
        let mut stmt = conn.prepare(
            r#"
            SELECT micro_line_id, line_order FROM production_line_micro_line
            WHERE production_line_id = ? ORDER BY line_order
            "#,
        )?;
        let rows = stmt.query_map(params![line_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    for (micro_line_id, order) in micro_orders {
        let micro_line = match load_micro_line(conn, &micro_line_id)? {
            Some(ml) => Ref::Resolved(ml),
            None => Ref::Id(micro_line_id),
        };
        line.micro_lines.push(MicroLineRef { micro_line, order });
    }

    Ok(Some(line))
}
