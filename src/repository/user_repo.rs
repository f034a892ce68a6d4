// ==========================================
// 建材商品目录系统 - 用户数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（口令校验在 auth 层）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::Role;
use crate::domain::user::User;
use crate::i18n;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, role, created_at, last_login";

// ==========================================
// UserRepository - 用户仓储
// ==========================================
pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    /// 创建新的 UserRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn list_users(&self) -> RepositoryResult<Vec<User>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM app_user ORDER BY created_at ASC, rowid ASC",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([], map_user_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM app_user WHERE username = ?1", USER_COLUMNS),
                params![username],
                map_user_row,
            )
            .optional()?;
        Ok(user)
    }

    /// 创建用户（用户名/邮箱大小写不敏感唯一）
    pub fn create_user(&self, username: &str, email: &str, role: Role) -> RepositoryResult<User> {
        let conn = self.get_conn()?;

        let taken = conn
            .query_row(
                "SELECT 1 FROM app_user
                 WHERE lower(username) = lower(?1) OR lower(email) = lower(?2) LIMIT 1",
                params![username, email],
                |_row| Ok(()),
            )
            .optional()?
            .is_some();
        if taken {
            return Err(RepositoryError::UniqueConstraintViolation(i18n::t(
                "auth.user_exists",
            )));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            role,
            created_at: Utc::now(),
            last_login: None,
        };
        conn.execute(
            "INSERT INTO app_user (id, username, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.username,
                user.email,
                user.role.as_str(),
                user.created_at
            ],
        )?;
        Ok(user)
    }

    /// 更新最后登录时间
    ///
    /// # 返回
    /// - Ok(None): 用户不存在
    pub fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE app_user SET last_login = ?2 WHERE id = ?1",
            params![id, at],
        )?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM app_user WHERE id = ?1", USER_COLUMNS),
                params![id],
                map_user_row,
            )
            .optional()?;
        Ok(user)
    }
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let raw_role: String = row.get(3)?;
    let role = raw_role.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role,
        created_at: row.get(4)?,
        last_login: row.get(5)?,
    })
}
