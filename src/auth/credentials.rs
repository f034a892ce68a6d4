// ==========================================
// 建材商品目录系统 - 输入清洗与凭据规则
// ==========================================

use crate::i18n;
use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static JAVASCRIPT_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)javascript:").unwrap());
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)on\w+\s*=").unwrap());
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static SPECIAL_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).unwrap());

pub const MIN_PASSWORD_LEN: usize = 8;

/// 去除 `<script>` 块、`javascript:` 与 `on*=` 事件属性后 trim
pub fn sanitize_input(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    let without_scheme = JAVASCRIPT_SCHEME.replace_all(&without_scripts, "");
    EVENT_HANDLER
        .replace_all(&without_scheme, "")
        .trim()
        .to_string()
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

/// 密码规则，返回全部未满足项（空表示通过）
pub fn validate_password(password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(i18n::t("auth.password_length"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(i18n::t("auth.password_upper"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(i18n::t("auth.password_lower"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(i18n::t("auth.password_digit"));
    }
    if !SPECIAL_CHAR.is_match(password) {
        errors.push(i18n::t("auth.password_special"));
    }
    errors
}
