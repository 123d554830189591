// ==========================================
// 玻璃深加工生产执行系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{OptimizationApi, ProductionApi};
use crate::config::config_manager::ConfigManager;
use crate::config::MesConfigReader;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{ProductLayerRepository, ProductionLineRepository, StepExecutionRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 产线定义仓储（用于维护产线图）
    pub production_line_repo: Arc<ProductionLineRepository>,

    /// 生产流转API
    pub production_api: Arc<ProductionApi>,

    /// 优化导出API
    pub optimization_api: Arc<OptimizationApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化 schema（幂等）
    /// 2. 初始化所有Repository
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let layer_repo = Arc::new(ProductLayerRepository::new(conn.clone()));
        let production_line_repo = Arc::new(ProductionLineRepository::new(conn.clone()));
        let execution_repo = Arc::new(StepExecutionRepository::new(conn.clone()));

        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 创建API实例
        // ==========================================
        let production_api = Arc::new(ProductionApi::new(
            layer_repo,
            production_line_repo.clone(),
            execution_repo,
        ));
        let config_reader: Arc<dyn MesConfigReader> = config.clone();
        let optimization_api =
            Arc::new(OptimizationApi::new(production_api.clone(), config_reader));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config,
            production_line_repo,
            production_api,
            optimization_api,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 GLASS_MES_DB_PATH → <data_dir>/glass-mes/glass_mes.db → ./glass_mes.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("GLASS_MES_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./glass_mes.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("glass-mes");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("glass_mes.db");
        }
    }

    path.to_string_lossy().to_string()
}
