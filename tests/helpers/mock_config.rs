// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use glass_mes::config::MesConfigReader;
use std::error::Error;

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub queue_poll_interval_secs: u64,
    pub trf_export_dir: String,
    pub trf_download_base_url: String,
}

impl MockConfig {
    /// 导出到指定目录
    pub fn exporting_to(dir: &std::path::Path) -> Self {
        Self {
            queue_poll_interval_secs: 30,
            trf_export_dir: dir.to_string_lossy().to_string(),
            trf_download_base_url: "https://mes.local/exports/trf".to_string(),
        }
    }
}

#[async_trait]
impl MesConfigReader for MockConfig {
    async fn get_queue_poll_interval_secs(&self) -> Result<u64, Box<dyn Error>> {
        Ok(self.queue_poll_interval_secs)
    }

    async fn get_trf_export_dir(&self) -> Result<String, Box<dyn Error>> {
        Ok(self.trf_export_dir.clone())
    }

    async fn get_trf_download_base_url(&self) -> Result<String, Box<dyn Error>> {
        Ok(self.trf_download_base_url.clone())
    }
}
