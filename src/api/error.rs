// ==========================================
// 建材商品目录系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换各层错误为用户可读的错误消息
// ==========================================

use crate::auth::AuthError;
use crate::domain::types::{Action, Resource};
use crate::i18n;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 认证/授权错误
    // ==========================================
    #[error("{}", i18n::t("auth.not_authenticated"))]
    Unauthenticated,

    #[error("{}", i18n::t_with_args("auth.permission_denied", &[("action", .action.to_string().as_str()), ("resource", .resource.to_string().as_str())]))]
    PermissionDenied { resource: Resource, action: Action },

    #[error("认证失败: {0}")]
    AuthFailed(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 大批量导入需显式确认
    #[error("{}", i18n::t_with_args("import.confirm_large", &[("rows", .rows.to_string().as_str())]))]
    ConfirmationRequired { rows: usize },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ImportError(err.user_message())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAuthenticated => ApiError::Unauthenticated,
            AuthError::Repository(e) => e.into(),
            AuthError::LockError(msg) => ApiError::InternalError(msg),
            other => ApiError::AuthFailed(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_message() {
        let err = ApiError::PermissionDenied {
            resource: Resource::Brands,
            action: Action::Delete,
        };
        assert_eq!(err.to_string(), "Permission denied: delete on brands");
    }

    #[test]
    fn test_confirmation_message_names_rows() {
        let err = ApiError::ConfirmationRequired { rows: 1500 };
        assert!(err.to_string().contains("1500 products"));
    }

    #[test]
    fn test_from_repository_unique_violation() {
        let err: ApiError =
            RepositoryError::UniqueConstraintViolation("dup".to_string()).into();
        assert!(matches!(err, ApiError::BusinessRuleViolation(ref m) if m == "dup"));
    }

    #[test]
    fn test_from_import_error_uses_user_message() {
        let err: ApiError = ImportError::EmptyTemplate.into();
        assert_eq!(
            err.to_string(),
            "文件导入失败: This format has no configured fields"
        );
    }
}
