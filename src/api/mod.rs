// ==========================================
// 建材商品目录系统 - API 层
// ==========================================
// 职责: 面向界面的业务接口（权限检查 + 错误转换）
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod import_api;

// 重导出核心类型
pub use catalog_api::{CatalogApi, CatalogExport};
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportSnapshot};
