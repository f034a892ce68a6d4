// ==========================================
// 建材商品目录系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, ImportLimits};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取并解析配置值，缺失或格式错误时返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> Result<usize, Box<dyn Error>> {
        let default = ImportLimits::default().batch_size;
        let value = self.get_parsed_or_default(config_keys::BATCH_SIZE, default)?;
        Ok(if value == 0 { default } else { value })
    }

    async fn get_batch_delay_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::BATCH_DELAY_MS,
            ImportLimits::default().batch_delay_ms,
        )
    }

    async fn get_max_file_size_mb(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::MAX_FILE_SIZE_MB,
            ImportLimits::default().max_file_size_mb,
        )
    }

    async fn get_max_reported_errors(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::MAX_REPORTED_ERRORS,
            ImportLimits::default().max_reported_errors,
        )
    }

    async fn get_max_processed_rows(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::MAX_PROCESSED_ROWS,
            ImportLimits::default().max_processed_rows,
        )
    }

    async fn get_large_file_rows(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::LARGE_FILE_ROWS,
            ImportLimits::default().large_file_rows,
        )
    }

    async fn get_very_large_file_rows(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::VERY_LARGE_FILE_ROWS,
            ImportLimits::default().very_large_file_rows,
        )
    }

    async fn get_confirm_threshold_rows(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::CONFIRM_THRESHOLD_ROWS,
            ImportLimits::default().confirm_threshold_rows,
        )
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const BATCH_SIZE: &str = "import.batch_size";
    pub const BATCH_DELAY_MS: &str = "import.batch_delay_ms";
    pub const MAX_FILE_SIZE_MB: &str = "import.max_file_size_mb";
    pub const MAX_REPORTED_ERRORS: &str = "import.max_reported_errors";
    pub const MAX_PROCESSED_ROWS: &str = "import.max_processed_rows";
    pub const LARGE_FILE_ROWS: &str = "import.large_file_rows";
    pub const VERY_LARGE_FILE_ROWS: &str = "import.very_large_file_rows";
    pub const CONFIRM_THRESHOLD_ROWS: &str = "import.confirm_threshold_rows";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = crate::db::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let cm = manager();
        let limits = cm.load_import_limits().await.unwrap();
        assert_eq!(limits, ImportLimits::default());
    }

    fn assert_send<T: Send>(value: T) -> T {
        value
    }

    #[tokio::test]
    async fn test_load_limits_reads_overrides_on_spawned_task() {
        let cm = Arc::new(manager());
        cm.set_config_value(config_keys::BATCH_SIZE, "7").unwrap();
        cm.set_config_value(config_keys::CONFIRM_THRESHOLD_ROWS, "50").unwrap();

        let reader = cm.clone();
        let limits = tokio::spawn(async move {
            assert_send(reader.load_import_limits()).await.unwrap()
        })
        .await
        .unwrap();
        assert_eq!(limits.batch_size, 7);
        assert_eq!(limits.confirm_threshold_rows, 50);
        assert_eq!(limits.max_reported_errors, 100);
    }

    #[tokio::test]
    async fn test_override_and_bad_value() {
        let cm = manager();
        cm.set_config_value(config_keys::BATCH_SIZE, "10").unwrap();
        cm.set_config_value(config_keys::BATCH_DELAY_MS, "abc").unwrap();

        assert_eq!(cm.get_batch_size().await.unwrap(), 10);
        assert_eq!(cm.get_batch_delay_ms().await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_zero_batch_size_falls_back() {
        let cm = manager();
        cm.set_config_value(config_keys::BATCH_SIZE, "0").unwrap();
        assert_eq!(cm.get_batch_size().await.unwrap(), 25);
    }

    #[test]
    fn test_snapshot_contains_keys() {
        let cm = manager();
        cm.set_config_value(config_keys::MAX_FILE_SIZE_MB, "5").unwrap();
        let snapshot = cm.get_config_snapshot().unwrap();
        let map: BTreeMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(map.get(config_keys::MAX_FILE_SIZE_MB).map(String::as_str), Some("5"));
    }
}
