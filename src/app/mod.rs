// ==========================================
// 建材商品目录系统 - 应用层
// ==========================================
// 职责: 服务装配（数据库 → 仓储 → 服务 → API）
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
