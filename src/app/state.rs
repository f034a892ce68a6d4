// ==========================================
// 建材商品目录系统 - 应用状态
// ==========================================
// 职责: 显式构造并装配所有服务（无全局单例）
// 共享: 单个 SQLite 连接（Arc<Mutex<Connection>>）
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{CatalogApi, ImportApi};
use crate::auth::AuthService;
use crate::config::{ConfigManager, ImportConfigReader, ImportLimits};
use crate::db;
use crate::importer::{FormatRegistry, ProductImporterImpl};
use crate::repository::{BrandRepository, FormatRepository, ProductRepository, UserRepository};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "PRODUCT_CATALOG_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径（内存库为 ":memory:"）
    pub db_path: String,

    /// 认证服务
    pub auth: Arc<AuthService>,

    /// 目录API
    pub catalog_api: Arc<CatalogApi>,

    /// 商品导入API
    pub import_api: Arc<ImportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 导入阈值快照（启动时读取）
    pub import_limits: ImportLimits,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 1. 打开连接并建表
    /// 2. 空库写入默认品牌与管理员
    /// 3. 读取导入配置并装配各 API
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        Self::from_connection(db_path, conn).await
    }

    /// 内存库实例（测试/演示）
    pub async fn in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory().map_err(|e| format!("无法打开内存库: {}", e))?;
        db::configure_sqlite_connection(&conn).map_err(|e| format!("PRAGMA 设置失败: {}", e))?;
        Self::from_connection(":memory:".to_string(), conn).await
    }

    async fn from_connection(db_path: String, conn: Connection) -> Result<Self, String> {
        db::ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        db::seed_defaults(&conn).map_err(|e| format!("默认数据写入失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let brand_repo = Arc::new(BrandRepository::from_connection(conn.clone()));
        let product_repo = Arc::new(ProductRepository::from_connection(conn.clone()));
        let format_repo = Arc::new(FormatRepository::from_connection(conn.clone()));
        let user_repo = Arc::new(UserRepository::from_connection(conn.clone()));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let import_limits = config_manager
            .load_import_limits()
            .await
            .map_err(|e| format!("导入配置读取失败: {}", e))?;

        // ==========================================
        // 服务与API
        // ==========================================
        let auth = Arc::new(AuthService::new(user_repo.clone()));
        let formats = Arc::new(FormatRegistry::new(format_repo));
        let importer = Arc::new(ProductImporterImpl::new(
            ProductRepository::from_connection(conn),
            import_limits,
            Box::new(crate::importer::ProductFieldMapper),
        ));

        let catalog_api = Arc::new(CatalogApi::new(
            auth.clone(),
            brand_repo.clone(),
            product_repo,
            user_repo,
            formats.clone(),
        ));
        let import_api = Arc::new(ImportApi::new(
            auth.clone(),
            importer,
            formats,
            brand_repo,
            import_limits,
        ));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            auth,
            catalog_api,
            import_api,
            config_manager,
            import_limits,
        })
    }
}

/// 默认数据库路径
///
/// 优先 PRODUCT_CATALOG_DB_PATH，其次用户数据目录下的 product-catalog/product_catalog.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./product_catalog.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("product-catalog");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("product_catalog.db");
        }
    }

    path.to_string_lossy().to_string()
}
