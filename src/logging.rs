// ==========================================
// 校园教务选课系统 - 日志初始化
// ==========================================
// 基于 tracing / tracing-subscriber
// 环境变量: RUST_LOG 控制级别, CAMPUS_KRS_LOG_FORMAT 控制格式
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 级别过滤器, 默认 `campus_krs_engine=info`
///   (如 RUST_LOG=campus_krs_engine::engine=debug 单独放开引擎层)
/// - CAMPUS_KRS_LOG_FORMAT: 设为 `json` 时输出结构化 JSON 行,
///   供教务平台的日志采集链路消费; 其余值为人读格式
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campus_krs_engine=info"));

    let json_format = std::env::var("CAMPUS_KRS_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_format {
        fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .init();
    }
}

/// 测试用日志初始化: debug 级别, 写入测试捕获器, 可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("campus_krs_engine=debug"))
        .with_test_writer()
        .try_init();
}
