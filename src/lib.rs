// ==========================================
// 建材商品目录系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 品牌/商品目录管理 + 电子表格批量导入
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 电子表格解析/校验/分批写入
pub mod importer;

// 认证与授权
pub mod auth;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 服务装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Action, FieldType, Resource, Role};

// 领域实体
pub use domain::{
    BatchResult, Brand, CellValue, ExcelFormat, FormatField, ImportPhase, ImportRow, Product,
    ProductDraft, Session, SpreadsheetFile, User, ValidationResult,
};

// 导入
pub use importer::{
    BatchSubmitter, FormatRegistry, FormatValidator, ProductImporter, ProductImporterImpl,
    TemplateFile,
};

// API
pub use api::{ApiError, ApiResult, CatalogApi, ImportApi};

// 应用状态
pub use app::AppState;

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用名称
pub const APP_NAME: &str = "建材商品目录系统";
