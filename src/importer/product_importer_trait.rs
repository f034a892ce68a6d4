// ==========================================
// 建材商品目录系统 - 商品导入 Trait
// ==========================================
// 职责: 定义导入管道各环节接口（不包含实现）
// 流程: 解析 → 校验 → 映射 → 分批落库
// ==========================================

use crate::domain::format::{ExcelFormat, FormatField};
use crate::domain::import::{BatchResult, ImportProgress, ImportRow, SpreadsheetFile, ValidationResult};
use crate::domain::product::ProductDraft;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawGrid;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

// ==========================================
// ProductImporter Trait
// ==========================================
// 实现者: ProductImporterImpl
#[async_trait]
pub trait ProductImporter: Send + Sync {
    /// 校验上传文件是否符合导入格式
    ///
    /// # 返回
    /// - ValidationResult: 错误/警告/可导入数据（校验结论是数据而不是 Err）
    async fn validate_file(&self, file: &SpreadsheetFile, format: &ExcelFormat) -> ValidationResult;

    /// 把已校验的数据行映射为商品并分批写入
    ///
    /// # 说明
    /// - 单批失败不会中断后续批次
    /// - 每批完成后回调进度；取消后不再开始新批次
    async fn import_rows(
        &self,
        brand_id: &str,
        format: &ExcelFormat,
        rows: &[ImportRow],
        cancel: &CancellationToken,
        on_progress: &mut (dyn FnMut(ImportProgress) + Send),
    ) -> BatchResult;
}

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件内容为原始网格（首行为表头，空白行已剔除）
    fn parse_grid(&self, bytes: &[u8]) -> ImportResult<RawGrid>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 实现者: ProductFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 将一行导入数据映射为商品草稿
    fn map_row(&self, brand_id: &str, fields: &[FormatField], row: &ImportRow) -> ProductDraft;
}
