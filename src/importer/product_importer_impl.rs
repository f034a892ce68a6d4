// ==========================================
// 建材商品目录系统 - 商品导入器实现
// ==========================================
// 职责: 整合导入流程，从上传文件到存储
// 流程: 解析 → 格式校验 → 字段映射 → 分批落库
// ==========================================

use crate::config::{ImportConfigReader, ImportLimits};
use crate::domain::format::ExcelFormat;
use crate::domain::import::{BatchResult, ImportProgress, ImportRow, SpreadsheetFile, ValidationResult};
use crate::domain::product::ProductDraft;
use crate::importer::batch_submitter::BatchSubmitter;
use crate::importer::field_mapper::ProductFieldMapper;
use crate::importer::format_validator::FormatValidator;
use crate::importer::product_importer_trait::{FieldMapper, ProductImporter};
use crate::repository::ProductImportRepository;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

// ==========================================
// ProductImporterImpl - 商品导入器实现
// ==========================================
pub struct ProductImporterImpl<R>
where
    R: ProductImportRepository,
{
    // 存储边界
    import_repo: R,

    // 导入组件
    validator: FormatValidator,
    field_mapper: Box<dyn FieldMapper>,
    submitter: BatchSubmitter,
}

impl<R> ProductImporterImpl<R>
where
    R: ProductImportRepository,
{
    /// 创建导入器
    ///
    /// # 参数
    /// - import_repo: 批量写入的存储边界
    /// - limits: 导入阈值快照
    /// - field_mapper: 行 → 商品映射器
    pub fn new(import_repo: R, limits: ImportLimits, field_mapper: Box<dyn FieldMapper>) -> Self {
        Self {
            import_repo,
            submitter: BatchSubmitter::from_limits(&limits),
            validator: FormatValidator::new(limits),
            field_mapper,
        }
    }

    /// 使用默认映射器，阈值从配置读取
    pub async fn from_config<C>(import_repo: R, config: &C) -> Result<Self, Box<dyn Error>>
    where
        C: ImportConfigReader + ?Sized,
    {
        let limits = config.load_import_limits().await?;
        debug!(?limits, "导入阈值已加载");
        Ok(Self::new(import_repo, limits, Box::new(ProductFieldMapper)))
    }

    pub fn limits(&self) -> &ImportLimits {
        self.validator.limits()
    }

    /// 映射全部数据行
    pub fn map_rows(&self, brand_id: &str, format: &ExcelFormat, rows: &[ImportRow]) -> Vec<ProductDraft> {
        rows.iter()
            .map(|row| self.field_mapper.map_row(brand_id, &format.fields, row))
            .collect()
    }
}

#[async_trait::async_trait]
impl<R> ProductImporter for ProductImporterImpl<R>
where
    R: ProductImportRepository,
{
    #[instrument(skip(self, file, format), fields(file = %file.name, format_id = %format.id))]
    async fn validate_file(&self, file: &SpreadsheetFile, format: &ExcelFormat) -> ValidationResult {
        let result = self.validator.validate_file(file, &format.fields);
        info!(
            is_valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "文件校验完成"
        );
        result
    }

    #[instrument(skip(self, format, rows, cancel, on_progress), fields(rows = rows.len()))]
    async fn import_rows(
        &self,
        brand_id: &str,
        format: &ExcelFormat,
        rows: &[ImportRow],
        cancel: &CancellationToken,
        on_progress: &mut (dyn FnMut(ImportProgress) + Send),
    ) -> BatchResult {
        let drafts = self.map_rows(brand_id, format, rows);
        info!(brand_id = %brand_id, drafts = drafts.len(), "开始分批导入");

        self.submitter
            .submit(drafts, &self.import_repo, cancel, |progress| on_progress(progress))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::db;
    use crate::domain::brand::NewBrand;
    use crate::domain::format::{NewFormat, NewFormatField};
    use crate::domain::types::FieldType;
    use crate::repository::{BrandRepository, FormatRepository, ProductRepository};
    use std::sync::{Arc, Mutex};

    struct Fixture {
        importer: ProductImporterImpl<ProductRepository>,
        products: ProductRepository,
        format: ExcelFormat,
        brand_id: String,
    }

    async fn fixture() -> Fixture {
        let conn = Arc::new(Mutex::new(db::open_in_memory().unwrap()));
        let brand = BrandRepository::from_connection(conn.clone())
            .create_brand(&NewBrand {
                name: "Condumex".to_string(),
                ..Default::default()
            })
            .unwrap();
        let format = FormatRepository::from_connection(conn.clone())
            .insert_format(
                &NewFormat {
                    brand_id: brand.id.clone(),
                    name: "Cables".to_string(),
                    ..Default::default()
                },
                &[
                    NewFormatField {
                        internal_name: "nombre".to_string(),
                        excel_label: "NOMBRE".to_string(),
                        field_type: FieldType::Text,
                        required: true,
                        options: Vec::new(),
                    },
                    NewFormatField {
                        internal_name: "precio".to_string(),
                        excel_label: "PRECIO".to_string(),
                        field_type: FieldType::Number,
                        required: true,
                        options: Vec::new(),
                    },
                    NewFormatField {
                        internal_name: "clave".to_string(),
                        excel_label: "CLAVE".to_string(),
                        field_type: FieldType::Text,
                        required: true,
                        options: Vec::new(),
                    },
                    NewFormatField {
                        internal_name: "codigo_barras".to_string(),
                        excel_label: "CODIGO".to_string(),
                        field_type: FieldType::Text,
                        required: true,
                        options: Vec::new(),
                    },
                    NewFormatField {
                        internal_name: "calibre".to_string(),
                        excel_label: "CALIBRE".to_string(),
                        field_type: FieldType::Text,
                        required: false,
                        options: Vec::new(),
                    },
                ],
            )
            .unwrap();

        let config = ConfigManager::from_connection(conn.clone()).unwrap();
        let importer = ProductImporterImpl::from_config(
            ProductRepository::from_connection(conn.clone()),
            &config,
        )
        .await
        .unwrap();

        Fixture {
            importer,
            products: ProductRepository::from_connection(conn),
            format,
            brand_id: brand.id,
        }
    }

    #[tokio::test]
    async fn test_validate_then_import_csv() {
        let fx = fixture().await;
        let csv = "NOMBRE,PRECIO,CLAVE,CODIGO,CALIBRE\n\
                   Cable THW,\"1,250.50\",C-1,7501,12 AWG\n\
                   Cable THHN,99,C-2,7502,\n";
        let file = SpreadsheetFile::new("cables.csv", "text/csv", csv.as_bytes().to_vec());

        let validation = fx.importer.validate_file(&file, &fx.format).await;
        assert!(validation.is_valid, "{:?}", validation.errors);
        let rows = validation.data.unwrap();
        assert_eq!(rows.len(), 2);

        let mut seen = Vec::new();
        let result = fx
            .importer
            .import_rows(&fx.brand_id, &fx.format, &rows, &CancellationToken::new(), &mut |p| {
                seen.push(p)
            })
            .await;

        assert_eq!(result.success_count, 2);
        assert!(result.errors.is_empty());
        assert_eq!(seen.len(), 1);

        let stored = fx.products.list_products_by_brand(&fx.brand_id, 1, 50, "thw").unwrap();
        assert_eq!(stored.total, 1);
        let product = &stored.products[0];
        assert_eq!(product.name, "Cable THW");
        // "1,250.50" → "1.250.50" → 最长数值前缀 1.250
        assert!((product.price - 1.25).abs() < 1e-9);
        assert_eq!(product.key, "C-1");
        assert_eq!(product.parameters.len(), 1);
        assert_eq!(product.parameters[0].name, "CALIBRE");
        assert_eq!(product.parameters[0].value, "12 AWG");
    }

    #[tokio::test]
    async fn test_default_limits_without_config() {
        let fx = fixture().await;
        assert_eq!(fx.importer.limits(), &ImportLimits::default());
    }
}
