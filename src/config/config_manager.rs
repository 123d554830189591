// ==========================================
// 玻璃深加工生产执行系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::mes_config_trait::MesConfigReader;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 默认轮询间隔（秒）
pub const DEFAULT_QUEUE_POLL_INTERVAL_SECS: u64 = 30;

/// 默认下载地址前缀
pub const DEFAULT_TRF_DOWNLOAD_BASE_URL: &str = "/exports/trf";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 启动日志与故障诊断
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

/// 默认 TRF 输出目录
pub fn default_trf_export_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("glass-mes").join("trf"),
        None => PathBuf::from("./trf"),
    }
}

// ==========================================
// MesConfigReader Trait 实现
// ==========================================
#[async_trait]
impl MesConfigReader for ConfigManager {
    async fn get_queue_poll_interval_secs(&self) -> Result<u64, Box<dyn Error>> {
        let default = DEFAULT_QUEUE_POLL_INTERVAL_SECS.to_string();
        let value = self.get_config_or_default(config_keys::QUEUE_POLL_INTERVAL_SECS, &default)?;
        match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => {
                tracing::warn!(
                    config_key = config_keys::QUEUE_POLL_INTERVAL_SECS,
                    raw_value = %value,
                    "轮询间隔配置无效，使用默认值"
                );
                Ok(DEFAULT_QUEUE_POLL_INTERVAL_SECS)
            }
        }
    }

    async fn get_trf_export_dir(&self) -> Result<String, Box<dyn Error>> {
        match self.get_config_value(config_keys::TRF_EXPORT_DIR)? {
            Some(dir) if !dir.trim().is_empty() => Ok(dir.trim().to_string()),
            _ => Ok(default_trf_export_dir().to_string_lossy().to_string()),
        }
    }

    async fn get_trf_download_base_url(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::TRF_DOWNLOAD_BASE_URL,
            DEFAULT_TRF_DOWNLOAD_BASE_URL,
        )?;
        Ok(value.trim().trim_end_matches('/').to_string())
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const QUEUE_POLL_INTERVAL_SECS: &str = "queue_poll_interval_secs";
    pub const TRF_EXPORT_DIR: &str = "trf_export_dir";
    pub const TRF_DOWNLOAD_BASE_URL: &str = "trf_download_base_url";
}
