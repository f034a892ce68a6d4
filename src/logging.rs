// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 过滤器: RUST_LOG 优先，否则使用 DEFAULT_FILTER
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 默认过滤器: 全局 info，导入流水线输出批次级 debug
pub const DEFAULT_FILTER: &str = "info,product_catalog::importer=debug";

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// 初始化日志系统（人类可读格式）
///
/// # 环境变量
/// - RUST_LOG: 覆盖默认过滤器
///   例如: RUST_LOG=debug 或 RUST_LOG=product_catalog::api=trace
///
/// # 示例
/// ```no_run
/// use product_catalog::logging;
/// logging::init();
/// ```
pub fn init() {
    // 宿主进程已安装 subscriber 时 try_init 返回 Err，忽略
    let _ = fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// JSON 行格式（宿主进程采集用）
pub fn init_json() {
    let _ = fmt()
        .json()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_current_span(true)
        .try_init();
}

/// 测试日志: debug 级别，输出交给测试框架捕获
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(env_filter("debug"))
        .with_test_writer()
        .try_init();
}
