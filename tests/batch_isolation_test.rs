// ==========================================
// 分批提交隔离性测试
// ==========================================
// 测试目标: 单批失败不影响其他批次；错误按批次汇总
// ==========================================


use async_trait::async_trait;
use product_catalog::config::ImportLimits;
use product_catalog::db;
use product_catalog::domain::product::ProductDraft;
use product_catalog::importer::{ProductFieldMapper, ProductImporter, ProductImporterImpl};
use product_catalog::repository::{
    BatchInsertOutcome, FormatRepository, ProductImportRepository, ProductRepository,
    RepositoryError, RepositoryResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use test_helpers::{catalog_fields, catalog_rows, import_rows, new_format};
use tokio_util::sync::CancellationToken;

/// 在指定批次注入失败的存储包装
struct FlakyStore {
    inner: ProductRepository,
    calls: AtomicUsize,
    fail_on: Vec<usize>,
}

#[async_trait]
impl ProductImportRepository for FlakyStore {
    async fn create_products_batch(
        &self,
        drafts: Vec<ProductDraft>,
    ) -> RepositoryResult<BatchInsertOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(RepositoryError::DatabaseQueryError(
                "simulated outage".to_string(),
            ));
        }
        self.inner.create_products_batch(drafts).await
    }
}

struct Setup {
    products: ProductRepository,
    format: product_catalog::ExcelFormat,
    conn: Arc<Mutex<rusqlite::Connection>>,
}

fn setup() -> Setup {
    let conn = db::open_in_memory().unwrap();
    db::seed_defaults(&conn).unwrap();
    let conn = Arc::new(Mutex::new(conn));
    let format = FormatRepository::from_connection(conn.clone())
        .insert_format(&new_format("3", "Cables"), &catalog_fields())
        .unwrap();
    Setup {
        products: ProductRepository::from_connection(conn.clone()),
        format,
        conn,
    }
}

fn importer(setup: &Setup, fail_on: Vec<usize>, limits: ImportLimits) -> ProductImporterImpl<FlakyStore> {
    let store = FlakyStore {
        inner: ProductRepository::from_connection(setup.conn.clone()),
        calls: AtomicUsize::new(0),
        fail_on,
    };
    ProductImporterImpl::new(store, limits, Box::new(ProductFieldMapper))
}

#[tokio::test(start_paused = true)]
async fn test_third_batch_failure_is_isolated() {
    let setup = setup();
    let importer = importer(&setup, vec![3], ImportLimits::default());
    let rows = import_rows(&setup.format, &catalog_rows(110));

    let result = importer
        .import_rows("3", &setup.format, &rows, &CancellationToken::new(), &mut |_| {})
        .await;

    assert_eq!(result.success_count, 110 - 25);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0], "Batch 3: Storage error: simulated outage");
    assert_eq!(result.batches_attempted, 5);

    assert_eq!(setup.products.count_by_brand("3").unwrap(), 85);
    let stored = setup.products.list_products_by_brand("3", 1, 200, "").unwrap();
    let keys: Vec<&str> = stored.products.iter().map(|p| p.key.as_str()).collect();
    // 批次 1-2 与 4-5 均已写入，批次 3（第 51-75 行）缺失
    assert!(keys.contains(&"K-00049"));
    assert!(!keys.contains(&"K-00050"));
    assert!(!keys.contains(&"K-00074"));
    assert!(keys.contains(&"K-00075"));
    assert!(keys.contains(&"K-00109"));
}

#[tokio::test]
async fn test_many_failed_batches_are_summarized() {
    let setup = setup();
    let limits = ImportLimits {
        batch_delay_ms: 0,
        ..ImportLimits::default()
    };
    let importer = importer(&setup, (1..=13).collect(), limits);
    let rows = import_rows(&setup.format, &catalog_rows(13 * 25));

    let result = importer
        .import_rows("3", &setup.format, &rows, &CancellationToken::new(), &mut |_| {})
        .await;

    assert_eq!(result.success_count, 0);
    assert_eq!(result.errors.len(), 13);

    let visible = result.visible_errors();
    assert_eq!(visible.len(), 11);
    assert!(visible[9].starts_with("Batch 10: "));
    assert_eq!(visible[10], "... and 3 more errors");
}

#[tokio::test]
async fn test_batches_follow_configured_size_and_order() {
    let setup = setup();
    let limits = ImportLimits {
        batch_size: 7,
        batch_delay_ms: 0,
        ..ImportLimits::default()
    };
    let importer = importer(&setup, Vec::new(), limits);
    let rows = import_rows(&setup.format, &catalog_rows(20));

    let mut progress = Vec::new();
    let result = importer
        .import_rows("3", &setup.format, &rows, &CancellationToken::new(), &mut |p| {
            progress.push((p.batch, p.processed_rows))
        })
        .await;

    assert_eq!(result.success_count, 20);
    assert_eq!(progress, vec![(1, 7), (2, 14), (3, 20)]);

    let stored = setup.products.list_products_by_brand("3", 1, 50, "").unwrap();
    let keys: Vec<&str> = stored.products.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys.first(), Some(&"K-00000"));
    assert_eq!(keys.last(), Some(&"K-00019"));
}
