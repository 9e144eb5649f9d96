/// 应用状态
///
/// 按配置组装文档库、提交后端与各个服务，并持有当前会话与表单

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::checklist::ChecklistDefinition;
use crate::services::application::{CsvExportService, RecordRenderer, SubmissionPipeline};
use crate::services::domain::{ApprovalController, InspectionForm, SessionContext, SignaturePad};
use crate::services::infrastructure::{
    AuthService, DocumentStoreBackend, MemoryInspectionStore, SpreadsheetEndpointClient,
    SqliteOrmInspectionStore,
};
use crate::services::traits::{
    BaseService, IConfirmationPrompt, IInspectionStore, ISubmissionBackend, IUserNotifier,
};
use crate::utils::config::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

/// 应用状态，包含所有服务实例
pub struct AppState {
    pub config: AppConfig,
    pub schema: ChecklistDefinition,
    pub store: Arc<dyn IInspectionStore>,
    pub backend: Arc<dyn ISubmissionBackend>,
    pub renderer: Arc<RecordRenderer>,
    pub pipeline: SubmissionPipeline,
    pub approval_controller: ApprovalController,
    pub export_service: CsvExportService,
    pub auth_service: AuthService,
    pub session: SessionContext,
    /// 当前会话独占的表单
    pub form: Mutex<InspectionForm>,
}

/// 系统状态信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub backend: String,
    pub collection_path: String,
    pub record_count: usize,
    pub signed_in_user: String,
    pub version: String,
}

/// 按配置创建文档库
async fn create_store(config: &AppConfig) -> AppResult<Arc<dyn IInspectionStore>> {
    let collection_path = config.collection_path();
    match config.backend_config.backend_type.as_str() {
        "memory" => {
            let mut store = MemoryInspectionStore::new(collection_path);
            store.initialize().await?;
            Ok(Arc::new(store))
        }
        // 试算表模式下列表、审核与匯出仍使用本地 SQLite 文档库
        "sqlite" | "spreadsheet" => {
            let mut store =
                SqliteOrmInspectionStore::new(Some(config.backend_config.database_path.as_path()), collection_path).await?;
            store.initialize().await?;
            Ok(Arc::new(store))
        }
        other => Err(AppError::configuration_error(format!("不支持的后端类型: {}", other))),
    }
}

/// 按配置创建提交后端
fn create_backend(config: &AppConfig, store: Arc<dyn IInspectionStore>) -> AppResult<Arc<dyn ISubmissionBackend>> {
    if config.backend_config.backend_type == "spreadsheet" {
        let client = SpreadsheetEndpointClient::from_config(&config.backend_config)?;
        info!("[AppState] 试算表端点: {}", client.endpoint_url());
        return Ok(Arc::new(client));
    }
    Ok(Arc::new(DocumentStoreBackend::new(store)))
}

/// 初始化应用状态
///
/// `notifier` 与 `prompt` 由宿主（命令行或界面）提供
pub async fn init_app_state(
    config: AppConfig,
    notifier: Arc<dyn IUserNotifier>,
    prompt: Arc<dyn IConfirmationPrompt>,
) -> AppResult<AppState> {
    let schema = ChecklistDefinition::load(config.checklist_path.as_deref())?;
    let store = create_store(&config).await?;
    let backend = create_backend(&config, store.clone())?;
    let renderer = Arc::new(RecordRenderer::new()?);

    let auth_service = AuthService::new(config.auth_config.clone());
    let session = auth_service.sign_in(None);
    if session.is_anonymous() && !config.approval_config.approver_ids.is_empty() {
        warn!("[AppState] 匿名会话不在审核名单内，无法执行审核");
    }

    let form = InspectionForm::new(
        schema.clone(),
        SignaturePad::from_config(&config.signature_config),
        time_utils::now_local(),
    );

    let pipeline = SubmissionPipeline::new(backend.clone(), notifier.clone());
    let approval_controller = ApprovalController::new(
        store.clone(),
        prompt,
        notifier.clone(),
        config.approval_config.clone(),
    );
    let export_service = CsvExportService::new(
        store.clone(),
        notifier,
        schema.clone(),
        config.export_config.clone(),
    );

    info!(
        "[AppState] 初始化完成: 后端 {}，集合 {}",
        backend.backend_name(),
        store.collection_path()
    );

    Ok(AppState {
        config,
        schema,
        store,
        backend,
        renderer,
        pipeline,
        approval_controller,
        export_service,
        auth_service,
        session,
        form: Mutex::new(form),
    })
}

impl AppState {
    /// 系统状态
    pub async fn system_status(&self) -> AppResult<SystemStatus> {
        let records = self.store.load_all_records().await?;
        Ok(SystemStatus {
            backend: self.backend.backend_name().to_string(),
            collection_path: self.store.collection_path().to_string(),
            record_count: records.len(),
            signed_in_user: self.session.short_id(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// 登出当前会话，结束所有绑定的背景任务
    pub fn shutdown(&self) {
        self.session.sign_out();
    }
}
