// ==========================================
// 建材商品目录系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;

// ==========================================
// ImportLimits - 导入参数快照
// ==========================================
// 校验器为纯函数，只接收快照，不直接读库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLimits {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub max_file_size_mb: usize,
    pub max_reported_errors: usize,
    pub max_processed_rows: usize,
    pub large_file_rows: usize,
    pub very_large_file_rows: usize,
    pub confirm_threshold_rows: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            batch_size: 25,
            batch_delay_ms: 200,
            max_file_size_mb: 10,
            max_reported_errors: 100,
            max_processed_rows: 20_000,
            large_file_rows: 5_000,
            very_large_file_rows: 15_000,
            confirm_threshold_rows: 1_000,
        }
    }
}

impl ImportLimits {
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
// 约定: 键不存在或无法解析时返回默认值
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 每批提交行数（默认 25，最小 1）
    async fn get_batch_size(&self) -> Result<usize, Box<dyn Error>>;

    /// 批次间隔（毫秒，默认 200）
    async fn get_batch_delay_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// 上传文件大小上限（MB，默认 10）
    async fn get_max_file_size_mb(&self) -> Result<usize, Box<dyn Error>>;

    /// 报告错误条数上限（默认 100）
    async fn get_max_reported_errors(&self) -> Result<usize, Box<dyn Error>>;

    /// 可导入数据行上限（默认 20000）
    async fn get_max_processed_rows(&self) -> Result<usize, Box<dyn Error>>;

    /// 大文件提示阈值（默认 5000）
    async fn get_large_file_rows(&self) -> Result<usize, Box<dyn Error>>;

    /// 超大文件（建议拆分）阈值（默认 15000）
    async fn get_very_large_file_rows(&self) -> Result<usize, Box<dyn Error>>;

    /// 需要显式确认的行数阈值（默认 1000）
    async fn get_confirm_threshold_rows(&self) -> Result<usize, Box<dyn Error>>;

    /// 一次读取全部导入参数
    async fn load_import_limits(&self) -> Result<ImportLimits, Box<dyn Error>> {
        // 逐条绑定: `?` 的残余值不能跨越下一个 await
        let batch_size = self.get_batch_size().await?;
        let batch_delay_ms = self.get_batch_delay_ms().await?;
        let max_file_size_mb = self.get_max_file_size_mb().await?;
        let max_reported_errors = self.get_max_reported_errors().await?;
        let max_processed_rows = self.get_max_processed_rows().await?;
        let large_file_rows = self.get_large_file_rows().await?;
        let very_large_file_rows = self.get_very_large_file_rows().await?;
        let confirm_threshold_rows = self.get_confirm_threshold_rows().await?;

        Ok(ImportLimits {
            batch_size,
            batch_delay_ms,
            max_file_size_mb,
            max_reported_errors,
            max_processed_rows,
            large_file_rows,
            very_large_file_rows,
            confirm_threshold_rows,
        })
    }
}
