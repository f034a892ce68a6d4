// ==========================================
// 建材商品目录系统 - 配置层
// ==========================================
// 职责: 导入参数读取与覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ImportConfigReader, ImportLimits};
