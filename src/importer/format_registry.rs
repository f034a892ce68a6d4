// ==========================================
// 建材商品目录系统 - 导入格式注册表
// ==========================================
// 职责: 导入格式的创建（含不变量校验）、查询与模板生成
// 不变量:
// - 至少一个字段
// - 表头（规范化后）互不相同
// - 内部键/表头非空
// - selection 字段必须有选项，其他类型不保存选项
// ==========================================

use crate::domain::format::{ExcelFormat, NewFormat, NewFormatField};
use crate::domain::types::FieldType;
use crate::i18n;
use crate::importer::data_cleaner::normalize_header;
use crate::importer::error::ImportResult;
use crate::importer::template::{TemplateFile, TemplateGenerator};
use crate::repository::{FormatRepository, RepositoryError, RepositoryResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct FormatRegistry {
    repo: Arc<FormatRepository>,
    templates: TemplateGenerator,
}

impl FormatRegistry {
    pub fn new(repo: Arc<FormatRepository>) -> Self {
        Self {
            repo,
            templates: TemplateGenerator,
        }
    }

    /// 创建导入格式
    ///
    /// # 错误
    /// - ValidationError: 字段列表违反格式不变量
    #[instrument(skip(self, new_format, fields), fields(brand_id = %new_format.brand_id, fields = fields.len()))]
    pub fn create_format(
        &self,
        new_format: &NewFormat,
        fields: &[NewFormatField],
    ) -> RepositoryResult<ExcelFormat> {
        let cleaned = clean_fields(fields);
        if let Err(reason) = check_fields(&cleaned) {
            warn!(reason = %reason, "导入格式校验失败");
            return Err(RepositoryError::ValidationError(i18n::t_with_args(
                "catalog.format_invalid",
                &[("reason", reason.as_str())],
            )));
        }

        let format = self.repo.insert_format(new_format, &cleaned)?;
        info!(format_id = %format.id, name = %format.name, "导入格式已创建");
        Ok(format)
    }

    /// 品牌下的导入格式（最新在前）
    pub fn formats_for_brand(&self, brand_id: &str) -> RepositoryResult<Vec<ExcelFormat>> {
        self.repo.list_formats_by_brand(brand_id)
    }

    pub fn list_formats(&self) -> RepositoryResult<Vec<ExcelFormat>> {
        self.repo.list_formats()
    }

    pub fn get_format(&self, id: &str) -> RepositoryResult<Option<ExcelFormat>> {
        self.repo.get_format(id)
    }

    pub fn delete_format(&self, id: &str) -> RepositoryResult<bool> {
        self.repo.delete_format(id)
    }

    /// 生成导入模板（xlsx）
    pub fn generate_template(
        &self,
        format: &ExcelFormat,
        brand_name: &str,
    ) -> ImportResult<TemplateFile> {
        self.templates.generate(format, brand_name)
    }
}

/// 去除首尾空白；非 selection 字段清空选项
fn clean_fields(fields: &[NewFormatField]) -> Vec<NewFormatField> {
    fields
        .iter()
        .map(|f| NewFormatField {
            internal_name: f.internal_name.trim().to_string(),
            excel_label: f.excel_label.trim().to_string(),
            field_type: f.field_type,
            required: f.required,
            options: if f.field_type == FieldType::Selection {
                f.options
                    .iter()
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect()
}

fn check_fields(fields: &[NewFormatField]) -> Result<(), String> {
    if fields.is_empty() {
        return Err(i18n::t("catalog.format_no_fields"));
    }

    let mut seen = HashSet::new();
    for field in fields {
        if field.excel_label.is_empty() {
            return Err(i18n::t("catalog.format_empty_label"));
        }
        let label = field.excel_label.as_str();
        if field.internal_name.is_empty() {
            return Err(i18n::t_with_args("catalog.format_empty_key", &[("label", label)]));
        }
        if !seen.insert(normalize_header(label)) {
            return Err(i18n::t_with_args(
                "catalog.format_duplicate_label",
                &[("label", label)],
            ));
        }
        if field.field_type == FieldType::Selection && field.options.is_empty() {
            return Err(i18n::t_with_args("catalog.format_no_options", &[("label", label)]));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::repository::BrandRepository;
    use std::sync::Mutex;

    fn registry() -> (FormatRegistry, String) {
        let conn = Arc::new(Mutex::new(db::open_in_memory().unwrap()));
        let brand = BrandRepository::from_connection(conn.clone())
            .create_brand(&crate::domain::brand::NewBrand {
                name: "Interceramic".to_string(),
                ..Default::default()
            })
            .unwrap();
        let repo = Arc::new(FormatRepository::from_connection(conn));
        (FormatRegistry::new(repo), brand.id)
    }

    fn field(label: &str, key: &str, field_type: FieldType, options: &[&str]) -> NewFormatField {
        NewFormatField {
            internal_name: key.to_string(),
            excel_label: label.to_string(),
            field_type,
            required: false,
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn new_format(brand_id: &str) -> NewFormat {
        NewFormat {
            brand_id: brand_id.to_string(),
            name: "Básico".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_format_trims_and_stores() {
        let (registry, brand_id) = registry();
        let format = registry
            .create_format(
                &new_format(&brand_id),
                &[
                    field(" NOMBRE ", "nombre", FieldType::Text, &["x"]),
                    field("COLOR", "color", FieldType::Selection, &[" Rojo ", "", "Azul"]),
                ],
            )
            .unwrap();

        assert_eq!(format.fields[0].excel_label, "NOMBRE");
        assert!(format.fields[0].options.is_empty());
        assert_eq!(format.fields[1].options, vec!["Rojo", "Azul"]);
        assert_eq!(registry.formats_for_brand(&brand_id).unwrap().len(), 1);
    }

    #[test]
    fn test_create_format_rejects_invariant_violations() {
        let (registry, brand_id) = registry();
        let format = new_format(&brand_id);

        let err = registry.create_format(&format, &[]).unwrap_err();
        assert!(err.to_string().contains("at least one field"));

        let err = registry
            .create_format(
                &format,
                &[
                    field("Precio", "precio", FieldType::Number, &[]),
                    field("  PRECIO", "precio_2", FieldType::Number, &[]),
                ],
            )
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column label"));

        let err = registry
            .create_format(&format, &[field("COLOR", "color", FieldType::Selection, &[])])
            .unwrap_err();
        assert!(err.to_string().contains("needs at least one option"));

        let err = registry
            .create_format(&format, &[field("COLOR", " ", FieldType::Text, &[])])
            .unwrap_err();
        assert!(err.to_string().contains("no internal name"));

        assert!(registry.formats_for_brand(&brand_id).unwrap().is_empty());
    }
}
