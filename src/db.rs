// ==========================================
// 玻璃深加工生产执行系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 建库脚本集中在 init_schema，幂等执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS treatment (
            treatment_id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS step (
            step_id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            step_type TEXT NOT NULL DEFAULT 'step',
            role TEXT NOT NULL DEFAULT 'standard',
            requires_scan INTEGER NOT NULL DEFAULT 0,
            password_hash TEXT
        );

        CREATE TABLE IF NOT EXISTS step_treatment (
            step_id TEXT NOT NULL REFERENCES step(step_id) ON DELETE CASCADE,
            treatment_id TEXT NOT NULL REFERENCES treatment(treatment_id),
            PRIMARY KEY (step_id, treatment_id)
        );

        CREATE TABLE IF NOT EXISTS micro_line (
            micro_line_id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS micro_line_step (
            micro_line_id TEXT NOT NULL REFERENCES micro_line(micro_line_id) ON DELETE CASCADE,
            step_id TEXT NOT NULL REFERENCES step(step_id),
            step_order INTEGER NOT NULL,
            PRIMARY KEY (micro_line_id, step_order)
        );

        CREATE TABLE IF NOT EXISTS production_line (
            production_line_id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS production_line_micro_line (
            production_line_id TEXT NOT NULL
                REFERENCES production_line(production_line_id) ON DELETE CASCADE,
            micro_line_id TEXT NOT NULL REFERENCES micro_line(micro_line_id),
            line_order INTEGER NOT NULL,
            PRIMARY KEY (production_line_id, line_order)
        );

        CREATE TABLE IF NOT EXISTS product_layer (
            layer_id TEXT PRIMARY KEY,
            production_code TEXT NOT NULL UNIQUE,
            glass_json TEXT,
            treatments_json TEXT NOT NULL DEFAULT '[]',
            width_mm REAL NOT NULL,
            height_mm REAL NOT NULL,
            quantity INTEGER,
            product_id TEXT,
            invoice_json TEXT,
            production_line_id TEXT REFERENCES production_line(production_line_id),
            production_date TEXT,
            current_step_id TEXT REFERENCES step(step_id),
            current_inventory_id TEXT,
            production_notes TEXT,
            design_number TEXT,
            revision INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_product_layer_current_step
            ON product_layer(current_step_id);

        CREATE TABLE IF NOT EXISTS step_execution (
            execution_id TEXT PRIMARY KEY,
            layer_id TEXT NOT NULL REFERENCES product_layer(layer_id),
            step_id TEXT NOT NULL REFERENCES step(step_id),
            production_line_id TEXT NOT NULL REFERENCES production_line(production_line_id),
            phase TEXT NOT NULL,
            scanned_at TEXT NOT NULL,
            treatments_json TEXT NOT NULL DEFAULT '[]',
            passed INTEGER NOT NULL,
            notes TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_step_execution_layer
            ON step_execution(layer_id, scanned_at);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}
