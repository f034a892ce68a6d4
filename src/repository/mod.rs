// ==========================================
// 建材商品目录系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod brand_repo;
pub mod error;
pub mod format_repo;
pub mod product_import_repo;
pub mod product_repo;
pub mod user_repo;

// 重导出核心仓储
pub use brand_repo::BrandRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use format_repo::FormatRepository;
pub use product_import_repo::{BatchInsertOutcome, ProductImportRepository};
pub use product_repo::ProductRepository;
pub use user_repo::UserRepository;
