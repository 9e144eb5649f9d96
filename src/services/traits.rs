/// 服务层基础trait定义
/// 提供各层服务的接口规范，支持依赖注入和测试

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::structs::*;
use crate::utils::error::AppResult;

/// 基础服务trait，所有服务都应实现
#[async_trait]
pub trait BaseService: Send + Sync {
    /// 服务名称
    fn service_name(&self) -> &'static str;

    /// 初始化服务
    async fn initialize(&mut self) -> AppResult<()>;

    /// 关闭服务
    async fn shutdown(&mut self) -> AppResult<()>;

    /// 健康检查
    async fn health_check(&self) -> AppResult<()>;
}

/// 巡察纪录文档库
///
/// 所有纪录存放在单一集合路径下；每次写入后广播一份完整快照
#[async_trait]
pub trait IInspectionStore: BaseService {
    /// 集合路径 `artifacts/<app_id>/public/data/inspections`
    fn collection_path(&self) -> &str;

    /// 新增纪录，由文档库指派ID与提交时间（严格递增）
    async fn create_record(&self, record: NewInspectionRecord) -> AppResult<InspectionRecord>;

    /// 按ID读取纪录
    async fn load_record(&self, id: &str) -> AppResult<Option<InspectionRecord>>;

    /// 读取全部纪录，按提交时间倒序
    async fn load_all_records(&self) -> AppResult<Vec<InspectionRecord>>;

    /// 写入审核决定
    ///
    /// 仅当纪录仍为待审核时生效，否则返回 `AlreadyDecided`；纪录不存在返回 `NotFoundError`
    async fn apply_approval(&self, id: &str, decision: &ApprovalDecision) -> AppResult<InspectionRecord>;

    /// 订阅纪录快照
    fn subscribe(&self) -> broadcast::Receiver<RecordsSnapshot>;

    /// 当前快照版本号
    fn current_revision(&self) -> u64;
}

/// 提交后端（文档库或试算表端点）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ISubmissionBackend: Send + Sync {
    /// 后端名称，用于日志与回执
    fn backend_name(&self) -> &'static str;

    /// 写入一笔新纪录
    async fn submit_record(&self, record: &NewInspectionRecord) -> AppResult<SubmissionReceipt>;
}

/// 使用者提示（对应页面上的 alert）
#[cfg_attr(test, mockall::automock)]
pub trait IUserNotifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// 阻塞式确认对话框
#[cfg_attr(test, mockall::automock)]
pub trait IConfirmationPrompt: Send + Sync {
    /// 返回 true 表示使用者确认
    fn confirm(&self, message: &str) -> bool;
}

/// 纪录列表的显示区域
pub trait IListView: Send + Sync {
    /// 以新内容整体替换列表
    fn replace_content(&self, html: String);

    /// 显示载入错误（列表内容保持不变）
    fn show_error(&self, message: &str);
}
