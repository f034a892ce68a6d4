// ==========================================
// 建材商品目录系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含导入逻辑
// ==========================================

pub mod brand;
pub mod format;
pub mod import;
pub mod product;
pub mod types;
pub mod user;

// 重导出核心类型
pub use brand::{Brand, BrandUpdate, NewBrand};
pub use format::{ExcelFormat, FormatField, NewFormat, NewFormatField};
pub use import::{
    BatchResult, CellValue, ImportPhase, ImportProgress, ImportRow, SpreadsheetFile,
    ValidationResult, ValidationSummary, ALLOWED_MIME_TYPES,
};
pub use product::{
    NewProduct, NewProductParameter, Product, ProductDraft, ProductPage, ProductParameter,
    ProductUpdate,
};
pub use types::{Action, FieldType, Resource, Role};
pub use user::{Session, User};
