// ==========================================
// 建材商品目录系统 - 认证服务
// ==========================================
// 职责: 登录/登出/注册、当前会话、权限判断
// 说明: 仅内置管理员凭据可登录；会话 24 小时有效
// ==========================================

use crate::auth::credentials::{sanitize_input, validate_email, validate_password};
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::login_guard::LoginGuard;
use crate::auth::permissions;
use crate::domain::types::{Action, Resource, Role};
use crate::domain::user::{Session, User};
use crate::repository::UserRepository;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument, warn};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@sistema.com";
const ADMIN_PASSWORD: &str = "Tesla369@";

pub const SESSION_HOURS: i64 = 24;
pub const TOKEN_BYTES: usize = 32;

pub struct AuthService {
    users: Arc<UserRepository>,
    guard: LoginGuard,
    session: Mutex<Option<Session>>,
}

impl AuthService {
    pub fn new(users: Arc<UserRepository>) -> Self {
        Self::with_guard(users, LoginGuard::default())
    }

    pub fn with_guard(users: Arc<UserRepository>, guard: LoginGuard) -> Self {
        Self {
            users,
            guard,
            session: Mutex::new(None),
        }
    }

    fn session_slot(&self) -> AuthResult<MutexGuard<'_, Option<Session>>> {
        self.session
            .lock()
            .map_err(|e| AuthError::LockError(e.to_string()))
    }

    /// 登录
    ///
    /// # 参数
    /// - identifier: 用户名或邮箱
    /// - password: 密码
    ///
    /// # 错误
    /// - Locked: 连续失败次数过多
    /// - InvalidCredentials: 凭据不正确
    pub fn sign_in(&self, identifier: &str, password: &str) -> AuthResult<Session> {
        self.sign_in_at(identifier, password, Utc::now())
    }

    #[instrument(skip(self, password, now))]
    fn sign_in_at(&self, identifier: &str, password: &str, now: DateTime<Utc>) -> AuthResult<Session> {
        let identifier = sanitize_input(identifier);
        let password = sanitize_input(password);

        self.guard.check(&identifier, now)?;

        let is_admin = identifier == ADMIN_USERNAME || identifier == ADMIN_EMAIL;
        if !is_admin || password != ADMIN_PASSWORD {
            self.guard.record(&identifier, false, now)?;
            warn!("登录失败: 凭据不正确");
            return Err(AuthError::InvalidCredentials);
        }

        let admin = match self.users.find_by_username(ADMIN_USERNAME)? {
            Some(user) => user,
            None => self
                .users
                .create_user(ADMIN_USERNAME, ADMIN_EMAIL, Role::Admin)?,
        };
        let admin = self.users.touch_last_login(&admin.id, now)?.unwrap_or(admin);
        self.guard.record(&identifier, true, now)?;

        let session = Session {
            user: admin,
            token: generate_token(),
            expires_at: now + Duration::hours(SESSION_HOURS),
            created_at: now,
        };
        *self.session_slot()? = Some(session.clone());

        info!(user_id = %session.user.id, expires_at = %session.expires_at, "登录成功");
        Ok(session)
    }

    pub fn sign_out(&self) -> AuthResult<()> {
        if let Some(session) = self.session_slot()?.take() {
            info!(user_id = %session.user.id, "已登出");
        }
        Ok(())
    }

    /// 当前会话（已过期的会话被清除）
    pub fn current_session(&self) -> Option<Session> {
        self.current_session_at(Utc::now())
    }

    fn current_session_at(&self, now: DateTime<Utc>) -> Option<Session> {
        let mut slot = self.session_slot().ok()?;
        if slot.as_ref().is_some_and(|s| s.is_expired(now)) {
            info!("会话已过期");
            *slot = None;
        }
        slot.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.current_session().map(|s| s.user)
    }

    /// 注册
    ///
    /// # 错误
    /// - InvalidEmail / WeakPassword: 输入不满足规则
    /// - Repository(UniqueConstraintViolation): 用户名或邮箱已存在
    #[instrument(skip(self, password))]
    pub fn sign_up(&self, email: &str, password: &str, username: &str, role: Role) -> AuthResult<User> {
        let email = sanitize_input(email);
        let username = sanitize_input(username);
        let password = sanitize_input(password);

        if !validate_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        let problems = validate_password(&password);
        if !problems.is_empty() {
            return Err(AuthError::WeakPassword(problems));
        }

        let user = self.users.create_user(&username, &email, role)?;
        info!(user_id = %user.id, role = %user.role, "用户已注册");
        Ok(user)
    }

    /// 当前用户是否具有权限（未登录一律拒绝）
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.current_user()
            .is_some_and(|u| permissions::has_permission(u.role, resource, action))
    }

    pub fn is_admin(&self) -> bool {
        self.current_user().is_some_and(|u| u.role == Role::Admin)
    }

    pub fn can_manage_content(&self) -> bool {
        self.current_user()
            .is_some_and(|u| permissions::can_manage_content(u.role))
    }

    pub fn can_manage_users(&self) -> bool {
        self.current_user()
            .is_some_and(|u| permissions::can_manage_users(u.role))
    }

    /// 要求已登录
    pub fn require_user(&self) -> AuthResult<User> {
        self.current_user().ok_or(AuthError::NotAuthenticated)
    }
}

/// 32 字节随机令牌（64 位十六进制）
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..TOKEN_BYTES).map(|_| rng.gen::<u8>()).collect();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::login_guard::MAX_LOGIN_ATTEMPTS;
    use crate::db;
    use crate::repository::RepositoryError;

    fn service() -> AuthService {
        let conn = db::open_in_memory().unwrap();
        db::seed_defaults(&conn).unwrap();
        let users = UserRepository::from_connection(Arc::new(Mutex::new(conn)));
        AuthService::new(Arc::new(users))
    }

    #[test]
    fn test_sign_in_with_username_or_email() {
        let auth = service();
        assert!(auth.current_user().is_none());

        let session = auth.sign_in(" admin ", "Tesla369@").unwrap();
        assert_eq!(session.token.len(), TOKEN_BYTES * 2);
        assert_eq!(session.expires_at - session.created_at, Duration::hours(24));
        assert!(session.user.last_login.is_some());
        assert!(auth.is_admin());

        auth.sign_out().unwrap();
        assert!(auth.current_session().is_none());

        auth.sign_in("admin@sistema.com", "Tesla369@").unwrap();
        assert!(auth.can_manage_users());
    }

    #[test]
    fn test_wrong_password_then_lockout() {
        let auth = service();
        let now = Utc::now();
        for _ in 0..MAX_LOGIN_ATTEMPTS {
            let err = auth.sign_in_at("admin", "nope", now).unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let err = auth.sign_in_at("admin", "Tesla369@", now).unwrap_err();
        assert!(matches!(err, AuthError::Locked { .. }));

        let later = now + Duration::minutes(16);
        assert!(auth.sign_in_at("admin", "Tesla369@", later).is_ok());
    }

    #[test]
    fn test_expired_session_is_dropped() {
        let auth = service();
        let session = auth.sign_in("admin", "Tesla369@").unwrap();
        assert!(auth
            .current_session_at(session.expires_at + Duration::seconds(1))
            .is_none());
        assert!(auth.current_session().is_none());
    }

    #[test]
    fn test_sign_up_rules() {
        let auth = service();
        assert!(matches!(
            auth.sign_up("bad-email", "Str0ng!pass", "ana", Role::Viewer),
            Err(AuthError::InvalidEmail)
        ));
        assert!(matches!(
            auth.sign_up("ana@tienda.mx", "weak", "ana", Role::Viewer),
            Err(AuthError::WeakPassword(_))
        ));

        let user = auth
            .sign_up("ana@tienda.mx", "Str0ng!pass", "ana", Role::Manager)
            .unwrap();
        assert_eq!(user.role, Role::Manager);

        let dup = auth
            .sign_up("ANA@tienda.mx", "Str0ng!pass", "otra", Role::Viewer)
            .unwrap_err();
        assert!(matches!(
            dup,
            AuthError::Repository(RepositoryError::UniqueConstraintViolation(_))
        ));
    }

    #[test]
    fn test_permissions_follow_session() {
        let auth = service();
        assert!(!auth.has_permission(Resource::Products, Action::Read));
        auth.sign_in("admin", "Tesla369@").unwrap();
        assert!(auth.has_permission(Resource::Users, Action::Delete));
        assert!(auth.can_manage_content());
    }
}
