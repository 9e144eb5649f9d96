/// 服务层模块，包含应用层、领域层与基础设施层的服务定义
///
/// - Application Layer: 应用服务，协调业务流程
/// - Domain Layer: 领域服务，包含核心业务逻辑
/// - Infrastructure Layer: 基础设施服务，处理外部依赖

/// 应用层服务模块
pub mod application;

/// 领域层服务模块
pub mod domain;

/// 基础设施层服务模块
pub mod infrastructure;

/// 服务层基础trait定义
pub mod traits;

// 重新导出基础trait
pub use traits::{BaseService, IConfirmationPrompt, IInspectionStore, IListView, ISubmissionBackend, IUserNotifier};

// 重新导出应用层服务
pub use application::{CsvExportService, LiveListBinding, RecordRenderer, SubmissionPipeline};

// 重新导出领域层服务
pub use domain::{ApprovalController, ApprovalOutcome, InspectionForm, SessionContext, SignaturePad};

// 重新导出基础设施层的主要类型
pub use infrastructure::{
    AuthService, DocumentStoreBackend, MemoryInspectionStore, SpreadsheetEndpointClient,
    SqliteOrmInspectionStore,
};
