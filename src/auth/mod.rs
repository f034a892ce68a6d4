// ==========================================
// 建材商品目录系统 - 认证与授权
// ==========================================
// 职责: 登录锁定、会话、权限策略、输入清洗
// ==========================================

pub mod auth_service;
pub mod credentials;
pub mod error;
pub mod login_guard;
pub mod permissions;

pub use auth_service::AuthService;
pub use credentials::{sanitize_input, validate_email, validate_password};
pub use error::{AuthError, AuthResult};
pub use login_guard::LoginGuard;
pub use permissions::has_permission;
