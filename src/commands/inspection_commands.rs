/// 巡察纪录相关的命令
///
/// 包括提交表单、审核、匯出 CSV 与渲染纪录列表。
/// 命令只负责转接服务并把结果整理成回应；提示文字由各服务通过 notifier 发出。

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::models::enums::ApprovalVerdict;
use crate::services::domain::ApprovalOutcome;

/// 提交回应
#[derive(Debug, Serialize)]
pub struct SubmitInspectionResponse {
    pub success: bool,
    pub message: String,
    pub record_id: Option<String>,
}

/// 审核请求
#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub record_id: String,
    /// `approve` / `reject`（也接受 `Approved` / `Rejected`）
    pub decision: String,
}

/// 审核回应
#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub success: bool,
    pub cancelled: bool,
    pub message: String,
    pub approval_status: Option<String>,
}

/// 匯出回应
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub success: bool,
    pub message: String,
    pub file_path: Option<String>,
    pub mime_type: Option<String>,
}

/// 提交当前表单
pub async fn submit_inspection(state: &AppState) -> Result<SubmitInspectionResponse, String> {
    let mut form = state.form.lock().await;
    match state.pipeline.submit(&state.session, &mut form).await {
        Ok(receipt) => {
            info!("提交完成，后端: {}", receipt.backend);
            Ok(SubmitInspectionResponse {
                success: true,
                message: "巡察紀錄提交成功！".to_string(),
                record_id: receipt.record_id,
            })
        }
        Err(e) => {
            error!("提交失败: {}", e);
            Ok(SubmitInspectionResponse {
                success: false,
                message: e.user_message(),
                record_id: None,
            })
        }
    }
}

/// 审核纪录
pub async fn handle_approval(request: ApprovalRequest, state: &AppState) -> Result<ApprovalResponse, String> {
    let verdict: ApprovalVerdict = request.decision.parse()?;
    info!("收到审核请求: {} → {}", request.record_id, verdict.command_name());

    match state
        .approval_controller
        .decide(&request.record_id, verdict, &state.session)
        .await
    {
        Ok(ApprovalOutcome::Applied(record)) => Ok(ApprovalResponse {
            success: true,
            cancelled: false,
            message: "審核狀態更新成功！".to_string(),
            approval_status: Some(record.approval_status.to_string()),
        }),
        Ok(ApprovalOutcome::Cancelled) => Ok(ApprovalResponse {
            success: false,
            cancelled: true,
            message: "已取消".to_string(),
            approval_status: None,
        }),
        Err(e) => Ok(ApprovalResponse {
            success: false,
            cancelled: false,
            message: e.user_message(),
            approval_status: None,
        }),
    }
}

/// 匯出 CSV 到目录（未指定时使用配置的输出目录）
pub async fn export_to_csv(output_dir: Option<String>, state: &AppState) -> Result<ExportResponse, String> {
    let dir = output_dir.map(std::path::PathBuf::from);
    match state.export_service.export_to_dir(&state.session, dir.as_deref()).await {
        Ok(path) => Ok(ExportResponse {
            success: true,
            message: format!("巡察紀錄已匯出: {}", path.display()),
            file_path: Some(path.to_string_lossy().to_string()),
            mime_type: Some(crate::services::application::csv_export_service::CSV_MIME_TYPE.to_string()),
        }),
        Err(e) => Ok(ExportResponse {
            success: false,
            message: e.user_message(),
            file_path: None,
            mime_type: None,
        }),
    }
}

/// 渲染当前全部纪录（按提交时间倒序）
pub async fn render_inspection_list(state: &AppState) -> Result<String, String> {
    let records = state
        .store
        .load_all_records()
        .await
        .map_err(|e| format!("載入錯誤: {}", e.user_message()))?;
    state
        .renderer
        .render_list(&records, Some(state.session.user_id()))
        .map_err(|e| e.to_string())
}
