// ==========================================
// 建材商品目录系统 - 认证错误类型
// ==========================================
// 消息经 i18n 输出（直接展示给用户）
// ==========================================

use crate::i18n;
use crate::repository::RepositoryError;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{}", i18n::t("auth.invalid_credentials"))]
    InvalidCredentials,

    /// 连续失败次数过多，until 之前拒绝登录
    #[error("{}", i18n::t_with_args("auth.locked", &[("time", .until.format("%H:%M:%S").to_string().as_str())]))]
    Locked { until: DateTime<Utc> },

    #[error("{}", i18n::t("auth.invalid_email"))]
    InvalidEmail,

    /// 密码规则未满足（逐条列出）
    #[error("{}", .0.join(", "))]
    WeakPassword(Vec<String>),

    #[error("{}", i18n::t("auth.not_authenticated"))]
    NotAuthenticated,

    #[error("会话锁获取失败: {0}")]
    LockError(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type AuthResult<T> = Result<T, AuthError>;
