//! # 日志记录模块 (Logging Module)
//!
//! ## 业务说明
//! 记录巡察系统运行过程中的关键事件：提交失败、后端异常、使用者操作（提交、审核、匯出）
//! 为故障排查和审核追踪提供依据
//!
//! ## 日志策略
//! - **业务日志**: 使用者提交、审核、匯出等操作
//! - **错误日志**: 后端写入失败、匯出失败等异常，便于问题定位
//!
//! ## Rust知识点
//! - **日志宏**: 使用log crate的宏系统
//! - **环境配置**: 通过env_logger进行环境变量配置
//! - **格式化**: 自定义日志输出格式和时间戳

use std::fs::OpenOptions;
use std::io::Write;

use crate::utils::config::LoggingConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

/// 便捷日志宏 - 只记录4类核心事件，避免日志冗余

/// 记录提交失败日志
#[macro_export]
macro_rules! log_submission_failure {
    ($msg:expr) => {
        log::error!("[提交失败] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[提交失败] {}", format!($msg, $($arg)*));
    };
}

/// 记录后端异常日志
#[macro_export]
macro_rules! log_backend_failure {
    ($msg:expr) => {
        log::error!("[后端异常] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[后端异常] {}", format!($msg, $($arg)*));
    };
}

/// 记录用户操作日志
#[macro_export]
macro_rules! log_user_operation {
    ($msg:expr) => {
        log::info!("[用户操作] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::info!("[用户操作] {}", format!($msg, $($arg)*));
    };
}

/// 记录匯出失败日志
#[macro_export]
macro_rules! log_export_failure {
    ($msg:expr) => {
        log::error!("[匯出失败] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[匯出失败] {}", format!($msg, $($arg)*));
    };
}

// 重新导出宏
pub use log_submission_failure;
pub use log_backend_failure;
pub use log_user_operation;
pub use log_export_failure;

/// 将配置中的级别字符串转换为 `LevelFilter`，无法识别时退回 Info
pub fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// 初始化日志系统
///
/// 格式 `[时间] [级别] [模块] 消息`；启用文件输出时写入 `log_file_path`，否则写到标准错误。
/// `RUST_LOG` 环境变量可覆盖配置中的级别。重复初始化返回错误，不影响已安装的 Logger。
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(parse_level(&config.log_level));
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{}] [{}] {}",
            time_utils::now_local().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    match (&config.log_file_path, config.file_output) {
        (Some(path), true) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        _ if config.console_output => {
            builder.target(env_logger::Target::Stderr);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }

    builder
        .try_init()
        .map_err(|e| AppError::configuration_error(format!("日志系统初始化失败: {}", e)))?;

    log::info!("日志系统初始化完成 - 级别: {}", config.log_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_strings_map_to_filters() {
        assert_eq!(parse_level("debug"), log::LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), log::LevelFilter::Warn);
        assert_eq!(parse_level("unknown"), log::LevelFilter::Info);
    }

    #[test]
    fn macros_accept_format_arguments() {
        let _ = env_logger::builder().is_test(true).try_init();
        crate::log_user_operation!("提交巡察紀錄 {}", "rec-1");
        crate::log_backend_failure!("写入失败");
        crate::log_submission_failure!("{} - {}", "rec-2", "网络错误");
        crate::log_export_failure!("沒有可匯出的紀錄。");
    }
}
