// ==========================================
// 建材商品目录系统 - 分批提交器
// ==========================================
// 职责: 商品草稿按固定批量顺序写入存储
// 约束:
// - 批次严格按输入顺序提交
// - 单批失败记录为 "Batch {n}: {message}"，不影响后续批次
// - 批次之间让出执行权（固定间隔），取消令牌在批次之间生效
// ==========================================

use crate::config::ImportLimits;
use crate::domain::import::{BatchResult, ImportProgress};
use crate::domain::product::ProductDraft;
use crate::i18n;
use crate::repository::ProductImportRepository;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub struct BatchSubmitter {
    batch_size: usize,
    delay: Duration,
}

impl BatchSubmitter {
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            delay,
        }
    }

    pub fn from_limits(limits: &ImportLimits) -> Self {
        Self::new(limits.batch_size, Duration::from_millis(limits.batch_delay_ms))
    }

    /// 分批提交
    ///
    /// # 返回
    /// - success_count: 未失败批次中实际写入的商品数
    /// - errors: 每个失败批次一条
    /// - skipped_duplicates: 存储层因重复跳过的行
    #[instrument(skip_all, fields(rows = drafts.len(), batch_size = self.batch_size))]
    pub async fn submit<F>(
        &self,
        drafts: Vec<ProductDraft>,
        repo: &dyn ProductImportRepository,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> BatchResult
    where
        F: FnMut(ImportProgress) + Send,
    {
        let total_rows = drafts.len();
        let total_batches = total_rows.div_ceil(self.batch_size);
        let mut result = BatchResult::default();
        let mut processed_rows = 0;

        for (index, chunk) in drafts.chunks(self.batch_size).enumerate() {
            let batch = index + 1;
            if cancel.is_cancelled() {
                info!(batch = batch, "导入已取消，停止提交");
                result.cancelled = true;
                break;
            }

            result.batches_attempted += 1;
            match repo.create_products_batch(chunk.to_vec()).await {
                Ok(outcome) => {
                    debug!(
                        batch = batch,
                        created = outcome.created.len(),
                        skipped = outcome.skipped.len(),
                        "批次写入完成"
                    );
                    result.success_count += outcome.created.len();
                    result.skipped_duplicates.extend(outcome.skipped);
                }
                Err(e) => {
                    warn!(batch = batch, error = %e, "批次写入失败");
                    let batch_text = batch.to_string();
                    let message = e.user_message();
                    result.errors.push(i18n::t_with_args(
                        "import.batch_failed",
                        &[("batch", batch_text.as_str()), ("message", message.as_str())],
                    ));
                }
            }

            processed_rows += chunk.len();
            on_progress(ImportProgress {
                batch,
                total_batches,
                processed_rows,
                total_rows,
            });

            if batch < total_batches && !self.delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(batch = batch, "导入在批次间隔中被取消");
                        result.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.delay) => {}
                }
            }
        }

        info!(
            success = result.success_count,
            failed_batches = result.errors.len(),
            skipped = result.skipped_duplicates.len(),
            cancelled = result.cancelled,
            "分批提交结束"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::{NewProduct, Product};
    use crate::repository::{BatchInsertOutcome, RepositoryError, RepositoryResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// 按批次序号注入失败的内存存储
    struct ScriptedStore {
        fail_batches: Vec<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedStore {
        fn new(fail_batches: Vec<usize>) -> Self {
            Self {
                fail_batches,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProductImportRepository for ScriptedStore {
        async fn create_products_batch(
            &self,
            drafts: Vec<ProductDraft>,
        ) -> RepositoryResult<BatchInsertOutcome> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(drafts.len());
                calls.len()
            };
            if self.fail_batches.contains(&call) {
                return Err(RepositoryError::DatabaseQueryError("disk full".to_string()));
            }
            let created = drafts
                .into_iter()
                .map(|d| Product {
                    id: d.product.key.clone(),
                    brand_id: d.product.brand_id,
                    name: d.product.name,
                    description: d.product.description,
                    price: d.product.price,
                    unit: d.product.unit,
                    image: d.product.image,
                    department: d.product.department,
                    barcode: d.product.barcode,
                    key: d.product.key,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                    parameters: Vec::new(),
                })
                .collect();
            Ok(BatchInsertOutcome {
                created,
                skipped: Vec::new(),
            })
        }
    }

    fn drafts(n: usize) -> Vec<ProductDraft> {
        (0..n)
            .map(|i| ProductDraft {
                product: NewProduct {
                    key: format!("K-{}", i),
                    barcode: format!("{}", i),
                    ..Default::default()
                },
                parameters: Vec::new(),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_batch_does_not_stop_the_run() {
        let store = ScriptedStore::new(vec![3]);
        let submitter = BatchSubmitter::new(25, Duration::from_millis(200));
        let mut progress = Vec::new();

        let result = submitter
            .submit(drafts(110), &store, &CancellationToken::new(), |p| progress.push(p))
            .await;

        assert_eq!(result.success_count, 85);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0], "Batch 3: Storage error: disk full");
        assert_eq!(result.batches_attempted, 5);
        assert!(!result.cancelled);
        assert_eq!(*store.calls.lock().unwrap(), vec![25, 25, 25, 25, 10]);
        assert_eq!(progress.len(), 5);
        assert_eq!(progress[4].processed_rows, 110);
        assert_eq!(progress[4].total_batches, 5);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let store = ScriptedStore::new(Vec::new());
        let submitter = BatchSubmitter::new(25, Duration::ZERO);
        let token = CancellationToken::new();
        token.cancel();

        let result = submitter.submit(drafts(30), &store, &token, |_| {}).await;
        assert!(result.cancelled);
        assert_eq!(result.batches_attempted, 0);
        assert_eq!(result.success_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_batches() {
        let store = ScriptedStore::new(Vec::new());
        let submitter = BatchSubmitter::new(10, Duration::from_millis(200));
        let token = CancellationToken::new();
        let trigger = token.clone();

        let result = submitter
            .submit(drafts(50), &store, &token, move |p| {
                if p.batch == 2 {
                    trigger.cancel();
                }
            })
            .await;

        assert!(result.cancelled);
        assert_eq!(result.batches_attempted, 2);
        assert_eq!(result.success_count, 20);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let store = ScriptedStore::new(Vec::new());
        let submitter = BatchSubmitter::new(25, Duration::ZERO);
        let result = submitter
            .submit(Vec::new(), &store, &CancellationToken::new(), |_| {})
            .await;
        assert_eq!(result, BatchResult::default());
    }
}
