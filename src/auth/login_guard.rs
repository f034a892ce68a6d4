// ==========================================
// 建材商品目录系统 - 登录失败锁定
// ==========================================
// 规则: 同一标识连续失败 5 次 → 自最后一次失败起锁定 15 分钟
//       成功登录或锁定到期后计数清零
// ==========================================

use crate::auth::error::{AuthError, AuthResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

pub const MAX_LOGIN_ATTEMPTS: u32 = 5;
pub const LOCKOUT_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    last_attempt: DateTime<Utc>,
}

pub struct LoginGuard {
    attempts: Mutex<HashMap<String, Attempts>>,
    max_attempts: u32,
    lockout: Duration,
}

impl Default for LoginGuard {
    fn default() -> Self {
        Self::new(MAX_LOGIN_ATTEMPTS, Duration::minutes(LOCKOUT_MINUTES))
    }
}

impl LoginGuard {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            lockout,
        }
    }

    fn lock(&self) -> AuthResult<MutexGuard<'_, HashMap<String, Attempts>>> {
        self.attempts
            .lock()
            .map_err(|e| AuthError::LockError(e.to_string()))
    }

    /// 检查是否允许尝试登录
    ///
    /// # 返回
    /// - Ok(remaining): 剩余可尝试次数
    /// - Err(Locked): 锁定中
    pub fn check(&self, identifier: &str, now: DateTime<Utc>) -> AuthResult<u32> {
        let mut attempts = self.lock()?;
        let Some(entry) = attempts.get(identifier).copied() else {
            return Ok(self.max_attempts);
        };

        if entry.count >= self.max_attempts {
            let until = entry.last_attempt + self.lockout;
            if now < until {
                return Err(AuthError::Locked { until });
            }
            debug!(identifier = %identifier, "锁定已到期，重置失败计数");
            attempts.remove(identifier);
            return Ok(self.max_attempts);
        }

        Ok(self.max_attempts - entry.count)
    }

    pub fn record(&self, identifier: &str, success: bool, now: DateTime<Utc>) -> AuthResult<()> {
        let mut attempts = self.lock()?;
        if success {
            attempts.remove(identifier);
            return Ok(());
        }

        let entry = attempts.entry(identifier.to_string()).or_insert(Attempts {
            count: 0,
            last_attempt: now,
        });
        entry.count += 1;
        entry.last_attempt = now;
        if entry.count >= self.max_attempts {
            warn!(identifier = %identifier, count = entry.count, "登录失败次数过多，已锁定");
        }
        Ok(())
    }

    /// 清理超过锁定时长的旧记录，返回清理条数
    pub fn cleanup(&self, now: DateTime<Utc>) -> AuthResult<usize> {
        let mut attempts = self.lock()?;
        let cutoff = now - self.lockout;
        let before = attempts.len();
        attempts.retain(|_, a| a.last_attempt >= cutoff);
        Ok(before - attempts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_after_max_failures_and_expiry() {
        let guard = LoginGuard::default();
        let t0 = Utc::now();

        for i in 0..MAX_LOGIN_ATTEMPTS {
            assert_eq!(guard.check("admin", t0).unwrap(), MAX_LOGIN_ATTEMPTS - i);
            guard.record("admin", false, t0).unwrap();
        }

        match guard.check("admin", t0 + Duration::minutes(14)) {
            Err(AuthError::Locked { until }) => assert_eq!(until, t0 + Duration::minutes(15)),
            other => panic!("expected lockout, got {:?}", other),
        }

        assert_eq!(
            guard.check("admin", t0 + Duration::minutes(16)).unwrap(),
            MAX_LOGIN_ATTEMPTS
        );
    }

    #[test]
    fn test_success_resets_counter() {
        let guard = LoginGuard::default();
        let now = Utc::now();
        guard.record("x", false, now).unwrap();
        guard.record("x", false, now).unwrap();
        assert_eq!(guard.check("x", now).unwrap(), 3);

        guard.record("x", true, now).unwrap();
        assert_eq!(guard.check("x", now).unwrap(), MAX_LOGIN_ATTEMPTS);
    }

    #[test]
    fn test_cleanup_old_attempts() {
        let guard = LoginGuard::default();
        let now = Utc::now();
        guard.record("old", false, now - Duration::minutes(30)).unwrap();
        guard.record("new", false, now).unwrap();
        assert_eq!(guard.cleanup(now).unwrap(), 1);
        assert_eq!(guard.check("new", now).unwrap(), 4);
    }
}
