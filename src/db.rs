// ==========================================
// 建材商品目录系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有连接的 PRAGMA 行为（外键 / busy_timeout）
// - 建表幂等（CREATE TABLE IF NOT EXISTS）
// - 空库时写入默认品牌与管理员
// ==========================================

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Duration;
use tracing::info;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 默认管理员 ID
pub const DEFAULT_ADMIN_ID: &str = "admin-1";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启（品牌删除级联依赖它）
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库（测试/临时会话）并建表
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS brand (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL COLLATE NOCASE UNIQUE,
            image TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            is_management INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product (
            id TEXT PRIMARY KEY,
            brand_id TEXT NOT NULL REFERENCES brand(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL DEFAULT 0,
            unit TEXT NOT NULL DEFAULT '',
            image TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            barcode TEXT NOT NULL UNIQUE,
            product_key TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_product_brand ON product(brand_id);

        CREATE TABLE IF NOT EXISTS product_parameter (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES product(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            param_type TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_parameter_product ON product_parameter(product_id);

        CREATE TABLE IF NOT EXISTS excel_format (
            id TEXT PRIMARY KEY,
            brand_id TEXT NOT NULL REFERENCES brand(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            color TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS excel_format_field (
            id TEXT PRIMARY KEY,
            format_id TEXT NOT NULL REFERENCES excel_format(id) ON DELETE CASCADE,
            internal_name TEXT NOT NULL,
            excel_label TEXT NOT NULL,
            field_type TEXT NOT NULL,
            required INTEGER NOT NULL DEFAULT 0,
            options_json TEXT NOT NULL DEFAULT '[]',
            order_index INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS app_user (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL COLLATE NOCASE UNIQUE,
            email TEXT NOT NULL COLLATE NOCASE UNIQUE,
            role TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_login TEXT
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 空库时写入默认数据（初始品牌 + 默认管理员）
pub fn seed_defaults(conn: &Connection) -> rusqlite::Result<()> {
    let now = Utc::now();

    let brand_count: i64 = conn.query_row("SELECT COUNT(*) FROM brand", [], |row| row.get(0))?;
    if brand_count == 0 {
        let initial_brands = [
            (
                "1",
                "Herramientas",
                "https://images.pexels.com/photos/162553/keys-workshop-mechanic-tools-162553.jpeg?auto=compress&cs=tinysrgb&w=800",
                "Herramientas y gestión",
                true,
            ),
            (
                "2",
                "Interceramic",
                "https://images.pexels.com/photos/1457842/pexels-photo-1457842.jpeg?auto=compress&cs=tinysrgb&w=800",
                "Click para explorar catálogo",
                false,
            ),
            (
                "3",
                "Condumex",
                "https://images.pexels.com/photos/257736/pexels-photo-257736.jpeg?auto=compress&cs=tinysrgb&w=800",
                "Click para explorar catálogo",
                false,
            ),
        ];
        for (id, name, image, description, is_management) in initial_brands {
            conn.execute(
                "INSERT INTO brand (id, name, image, description, is_management, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, name, image, description, is_management, now],
            )?;
        }
        info!(count = initial_brands.len(), "已写入初始品牌");
    }

    conn.execute(
        "INSERT OR IGNORE INTO app_user (id, username, email, role, created_at)
         VALUES (?1, 'admin', 'admin@sistema.com', 'admin', ?2)",
        params![DEFAULT_ADMIN_ID, now],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_seed_defaults_only_once() {
        let conn = open_in_memory().unwrap();
        seed_defaults(&conn).unwrap();
        seed_defaults(&conn).unwrap();

        let brands: i64 = conn
            .query_row("SELECT COUNT(*) FROM brand", [], |row| row.get(0))
            .unwrap();
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM app_user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(brands, 3);
        assert_eq!(users, 1);
    }

    #[test]
    fn test_read_schema_version_without_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
