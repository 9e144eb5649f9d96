/// 领域服务层模块
/// 包含签名、表单收集、会话与审核的核心逻辑

/// 签名板 - 手写签名的点阵与PNG匯出
pub mod signature_pad;

/// 表单状态收集 - 以检查表驱动读取控件
pub mod form_state_collector;

/// 登入会话
pub mod session;

/// 审核控制器 - 唯一负责修改审核栏位的地方
pub mod approval_controller;

// 重新导出常用类型
pub use signature_pad::{PointerPosition, SignaturePad};
pub use form_state_collector::{FormState, IFormControls, InspectionForm, ItemControls, SubmitControl};
pub use session::SessionContext;
pub use approval_controller::{ApprovalController, ApprovalOutcome};
