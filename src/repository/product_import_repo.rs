// ==========================================
// 建材商品目录系统 - 商品导入 Repository Trait
// ==========================================
// 职责: 定义批量导入使用的存储边界（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据写入
// ==========================================

use crate::domain::product::{Product, ProductDraft};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 一次批量写入的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchInsertOutcome {
    /// 实际写入的商品
    pub created: Vec<Product>,
    /// 因条码/编码重复被跳过的行（每行一条说明）
    pub skipped: Vec<String>,
}

// ==========================================
// ProductImportRepository Trait
// ==========================================
// 实现者: ProductRepository（使用 rusqlite）
#[async_trait]
pub trait ProductImportRepository: Send + Sync {
    /// 批量写入商品草稿
    ///
    /// # 返回
    /// - Ok(BatchInsertOutcome): 写入与跳过的明细
    /// - Err: 存储失败（整批回滚）
    async fn create_products_batch(
        &self,
        drafts: Vec<ProductDraft>,
    ) -> RepositoryResult<BatchInsertOutcome>;
}
