// ==========================================
// 建材商品目录系统 - 导入层
// ==========================================
// 职责: 电子表格 → 校验结果 → 商品草稿 → 分批落库
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod batch_submitter;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod format_registry;
pub mod format_validator;
pub mod product_importer_impl;
pub mod product_importer_trait;
pub mod template;

// 重导出核心类型
pub use batch_submitter::BatchSubmitter;
pub use error::{ImportError, ImportResult};
pub use field_mapper::{ProductAttribute, ProductFieldMapper};
pub use file_parser::{CsvParser, ExcelParser, RawGrid, UniversalFileParser};
pub use format_registry::FormatRegistry;
pub use format_validator::FormatValidator;
pub use product_importer_impl::ProductImporterImpl;
pub use template::{TemplateFile, TemplateGenerator};

// 重导出 Trait 接口
pub use product_importer_trait::{FieldMapper, FileParser, ProductImporter};
