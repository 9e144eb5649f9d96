/// 基础设施层服务模块
/// 负责与外部系统的交互：文档库持久化、试算表端点、登入令牌

/// 文档库持久化相关模块
pub mod persistence;

/// 文档库提交后端
pub mod document_store_backend;

/// 试算表端点
pub mod spreadsheet;

/// 登入服务
pub mod auth;

// 重新导出常用实现
pub use persistence::*;
pub use document_store_backend::DocumentStoreBackend;
pub use spreadsheet::SpreadsheetEndpointClient;
pub use auth::AuthService;
