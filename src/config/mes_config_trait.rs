// ==========================================
// 玻璃深加工生产执行系统 - 配置读取 Trait
// ==========================================
// 职责: 定义轮询与导出所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// MesConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait MesConfigReader: Send + Sync {
    /// 优化队列轮询间隔（秒）
    ///
    /// # 默认值
    /// - 30
    async fn get_queue_poll_interval_secs(&self) -> Result<u64, Box<dyn Error>>;

    /// TRF 文件输出目录
    ///
    /// # 默认值
    /// - <data_dir>/glass-mes/trf，无法获取数据目录时为 ./trf
    async fn get_trf_export_dir(&self) -> Result<String, Box<dyn Error>>;

    /// TRF 下载地址前缀
    ///
    /// # 默认值
    /// - /exports/trf
    async fn get_trf_download_base_url(&self) -> Result<String, Box<dyn Error>>;
}
