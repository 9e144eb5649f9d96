use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序统一错误类型
/// 用于封装巡察系统中可能出现的各种错误，提供统一的错误处理机制
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AppError {
    /// 通用错误，包含错误消息
    #[error("通用错误: {message}")]
    Generic { message: String },

    /// 输入/输出错误
    #[error("IO错误: {message} (Kind: {kind})")]
    IoError { message: String, kind: String },

    /// 数据持久化相关错误（文档库写入/读取失败）
    #[error("持久化错误: {message}")]
    PersistenceError { message: String },

    /// 数据序列化/反序列化错误
    #[error("序列化错误: {message}")]
    SerializationError { message: String },

    /// 配置相关错误
    #[error("配置错误: {message}")]
    ConfigurationError { message: String },

    /// 验证错误（必填栏位缺失、签名为空）
    ///
    /// **业务含义**: 阻止提交，不产生任何副作用，草稿保持原样
    #[error("验证错误: {message}")]
    ValidationError { message: String },

    /// 并发/异步操作错误（重复提交）
    #[error("并发错误: {message}")]
    ConcurrencyError { message: String },

    /// 资源未找到错误
    #[error("资源未找到: {resource_type} - {message}")]
    NotFoundError {
        resource_type: String,
        message: String,
    },

    /// 网络相关错误（请求无法送达后端）
    #[error("网络错误: {message}")]
    NetworkError { message: String },

    /// 后端明确拒绝了写入请求
    ///
    /// **业务含义**: `message` 为后端回报的原始文字，需原样呈现给使用者
    #[error("后端拒绝: {message}")]
    BackendRejected { message: String },

    /// 审核竞争：记录已经审核过
    #[error("记录已审核: {record_id} 当前状态 {status}")]
    AlreadyDecided { record_id: String, status: String },

    /// 没有可匯出的紀錄
    #[error("无可导出数据: {message}")]
    NothingToExport { message: String },


    /// JSON序列化/反序列化错误
    #[error("JSON序列化/反序列化错误: {message}")]
    JsonError { message: String },

    /// 模板引擎错误
    #[error("模板引擎错误: {message}")]
    TemplateError { message: String },

    /// 签名图像编码错误
    #[error("图像编码错误: {message}")]
    ImageEncodingError { message: String },

    /// 用户认证错误
    #[error("用户认证错误: {message}")]
    AuthenticationError { message: String },

    /// 权限验证错误
    #[error("权限验证错误: {message}")]
    AuthorizationError { message: String },
}

impl AppError {
    /// 创建通用错误
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// 创建IO错误
    pub fn io_error(message: impl Into<String>, kind_str: impl Into<String>) -> Self {
        Self::IoError {
            message: message.into(),
            kind: kind_str.into(),
        }
    }

    /// 创建持久化错误
    pub fn persistence_error(message: impl Into<String>) -> Self {
        Self::PersistenceError {
            message: message.into(),
        }
    }

    /// 创建序列化错误
    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// 创建验证错误
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// 创建并发错误
    pub fn concurrency_error(message: impl Into<String>) -> Self {
        Self::ConcurrencyError {
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    pub fn not_found_error(resource_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFoundError {
            resource_type: resource_type.into(),
            message: message.into(),
        }
    }

    /// 创建网络错误
    pub fn network_error(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// 创建后端拒绝错误
    pub fn backend_rejected(message: impl Into<String>) -> Self {
        Self::BackendRejected {
            message: message.into(),
        }
    }

    /// 创建审核竞争错误
    pub fn already_decided(record_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::AlreadyDecided {
            record_id: record_id.into(),
            status: status.into(),
        }
    }

    /// 创建无可导出数据错误
    pub fn nothing_to_export(message: impl Into<String>) -> Self {
        Self::NothingToExport {
            message: message.into(),
        }
    }


    /// 创建JSON序列化错误
    pub fn json_error(message: impl Into<String>) -> Self {
        Self::JsonError {
            message: message.into(),
        }
    }

    /// 创建模板引擎错误
    pub fn template_error(message: impl Into<String>) -> Self {
        Self::TemplateError {
            message: message.into(),
        }
    }

    /// 创建图像编码错误
    pub fn image_encoding_error(message: impl Into<String>) -> Self {
        Self::ImageEncodingError {
            message: message.into(),
        }
    }

    /// 创建用户认证错误
    pub fn authentication_error(message: impl Into<String>) -> Self {
        Self::AuthenticationError {
            message: message.into(),
        }
    }

    /// 创建权限验证错误
    pub fn authorization_error(message: impl Into<String>) -> Self {
        Self::AuthorizationError {
            message: message.into(),
        }
    }

    /// 获取错误的简短描述
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Generic { .. } => "GENERIC",
            AppError::IoError { .. } => "IO_ERROR",
            AppError::PersistenceError { .. } => "PERSISTENCE_ERROR",
            AppError::SerializationError { .. } => "SERIALIZATION_ERROR",
            AppError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::ConcurrencyError { .. } => "CONCURRENCY_ERROR",
            AppError::NotFoundError { .. } => "NOT_FOUND_ERROR",
            AppError::NetworkError { .. } => "NETWORK_ERROR",
            AppError::BackendRejected { .. } => "BACKEND_REJECTED",
            AppError::AlreadyDecided { .. } => "ALREADY_DECIDED",
            AppError::NothingToExport { .. } => "NOTHING_TO_EXPORT",
            AppError::JsonError { .. } => "JSON_ERROR",
            AppError::TemplateError { .. } => "TEMPLATE_ERROR",
            AppError::ImageEncodingError { .. } => "IMAGE_ENCODING_ERROR",
            AppError::AuthenticationError { .. } => "AUTHENTICATION_ERROR",
            AppError::AuthorizationError { .. } => "AUTHORIZATION_ERROR",
        }
    }

    /// 是否属于传输类错误（网络不通或后端拒绝），此类错误允许使用者重试
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError { .. }
                | AppError::BackendRejected { .. }
                | AppError::PersistenceError { .. }
        )
    }

    /// 提供给使用者的提示文字
    ///
    /// 只取错误内部的消息本体，不带错误分类前缀，后端回报的文字原样保留
    pub fn user_message(&self) -> String {
        match self {
            AppError::Generic { message }
            | AppError::PersistenceError { message }
            | AppError::SerializationError { message }
            | AppError::ConfigurationError { message }
            | AppError::ValidationError { message }
            | AppError::ConcurrencyError { message }
            | AppError::NetworkError { message }
            | AppError::BackendRejected { message }
            | AppError::NothingToExport { message }
            | AppError::JsonError { message }
            | AppError::TemplateError { message }
            | AppError::ImageEncodingError { message }
            | AppError::AuthenticationError { message }
            | AppError::AuthorizationError { message } => message.clone(),
            AppError::IoError { message, .. } => message.clone(),
            AppError::NotFoundError { message, .. } => message.clone(),
            AppError::AlreadyDecided { .. } => "此紀錄已審核，無法重複審核。".to_string(),
        }
    }
}

/// 标准 I/O 错误到 AppError 的转换
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError { message: err.to_string(), kind: format!("{:?}", err.kind()) }
    }
}

/// serde_json 错误到 AppError 的转换
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError { message: err.to_string() }
    }
}

/// 字符串错误到 AppError 的转换（通用错误）
impl From<String> for AppError {
    fn from(err_msg: String) -> Self {
        Self::Generic { message: err_msg }
    }
}

/// &str 错误到 AppError 的转换（通用错误）
impl From<&str> for AppError {
    fn from(err_msg: &str) -> Self {
        Self::Generic { message: err_msg.to_string() }
    }
}

/// SeaORM 数据库错误到 AppError 的转换
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::PersistenceError { message: format!("数据库错误: {}", err) }
    }
}

/// reqwest 错误到 AppError 的转换
///
/// 超时与连线失败都归类为网络错误，保留原始错误文字便于排查
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::NetworkError { message: format!("请求超时: {}", err) }
        } else {
            AppError::NetworkError { message: err.to_string() }
        }
    }
}

/// Tera 模板错误到 AppError 的转换
impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::TemplateError { message: format!("模板渲染失败: {}", err) }
    }
}

/// PNG 编码错误到 AppError 的转换
impl From<png::EncodingError> for AppError {
    fn from(err: png::EncodingError) -> Self {
        AppError::ImageEncodingError { message: format!("PNG编码失败: {}", err) }
    }
}

/// config 加载错误到 AppError 的转换
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigurationError { message: err.to_string() }
    }
}

/// 应用程序结果类型别名
/// 简化错误处理的类型定义
pub type AppResult<T> = Result<T, AppError>;
