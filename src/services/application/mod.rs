/// 应用层服务模块
///
/// 应用层负责协调领域服务和基础设施服务，实现完整的业务流程：
/// 提交、渲染、匯出与即时列表

/// 提交管线 - 校验草稿并写入后端
pub mod submission_pipeline;
pub mod record_renderer;
pub mod csv_export_service;
pub mod live_list_binding;

// 重新导出主要的服务
pub use submission_pipeline::SubmissionPipeline;
pub use record_renderer::RecordRenderer;
pub use csv_export_service::{CsvDocument, CsvExportService};
pub use live_list_binding::LiveListBinding;
