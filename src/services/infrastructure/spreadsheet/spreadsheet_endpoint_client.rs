// 试算表端点客户端
//
// 以 URL 编码表单 POST 一笔纪录，端点回传 `{"result": "success"}` 或 `{"result": "error", "error": "..."}`

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;

use crate::log_backend_failure;
use crate::models::structs::{NewInspectionRecord, SubmissionReceipt};
use crate::services::traits::ISubmissionBackend;
use crate::utils::config::BackendConfig;
use crate::utils::error::{AppError, AppResult};

/// 复选巡察点的连接符
pub const PATROL_POINT_SEPARATOR: &str = "、";

/// 端点回应
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointResponse {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct SpreadsheetEndpointClient {
    client: reqwest::Client,
    endpoint_url: String,
}

impl SpreadsheetEndpointClient {
    pub fn new(endpoint_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::configuration_error(format!("创建HTTP客户端失败: {}", e)))?;
        Ok(Self {
            client,
            endpoint_url: endpoint_url.into(),
        })
    }

    /// 依后端配置创建，未配置端点 URL 时返回配置错误
    pub fn from_config(config: &BackendConfig) -> AppResult<Self> {
        let url = config
            .spreadsheet_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AppError::configuration_error("试算表后端需要设置 spreadsheet_url"))?;
        Self::new(url, Duration::from_millis(config.request_timeout_ms))
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

/// 复选巡察点的栏位名：`patrolPoints_<地点><穀倉编号数字>`
pub fn patrol_points_key(location: &str, silo_id: &str) -> String {
    format!("patrolPoints_{}{}", location, silo_id.trim_start_matches('#'))
}

/// 组装表单栏位（保持固定顺序）
pub fn build_form_fields(record: &NewInspectionRecord) -> AppResult<Vec<(String, String)>> {
    let check_items = serde_json::to_string(&record.check_items)?;
    let mut fields = vec![
        ("inspectionType".to_string(), record.inspection_type.to_string()),
        ("location".to_string(), record.location.clone()),
        ("siloId".to_string(), record.silo_id.clone()),
        ("operationStatus".to_string(), record.operation_status.to_string()),
        ("inspectionDate".to_string(), record.inspection_date.clone()),
        ("inspectorId".to_string(), record.inspector_id.clone()),
        ("inspectorName".to_string(), record.inspector_name.clone()),
        ("generalNotes".to_string(), record.general_notes.clone()),
        ("inspectorSignature".to_string(), record.inspector_signature.clone()),
        ("approvalStatus".to_string(), record.approval_status.to_string()),
        ("checkItems".to_string(), check_items),
    ];
    if !record.patrol_points.is_empty() {
        fields.push((
            patrol_points_key(&record.location, &record.silo_id),
            record.patrol_points.join(PATROL_POINT_SEPARATOR),
        ));
    }
    Ok(fields)
}

/// 解析端点回应；`result` 不是 success 时以 `error` 内容作为后端讯息
pub fn interpret_response(response: EndpointResponse) -> AppResult<()> {
    if response.result == "success" {
        return Ok(());
    }
    let message = response
        .error
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| format!("未知的端点回应: {}", response.result));
    Err(AppError::backend_rejected(message))
}

#[async_trait]
impl ISubmissionBackend for SpreadsheetEndpointClient {
    fn backend_name(&self) -> &'static str {
        "spreadsheet"
    }

    async fn submit_record(&self, record: &NewInspectionRecord) -> AppResult<SubmissionReceipt> {
        let fields = build_form_fields(record)?;
        debug!("[SpreadsheetEndpointClient] POST {} ({} 个栏位)", self.endpoint_url, fields.len());

        let response = self
            .client
            .post(&self.endpoint_url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| {
                log_backend_failure!("试算表端点请求失败: {}", e);
                AppError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log_backend_failure!("试算表端点回应 {}: {}", status, body);
            return Err(AppError::network_error(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: EndpointResponse = response.json().await?;
        interpret_response(parsed)?;
        info!("[SpreadsheetEndpointClient] 纪录已写入试算表");

        Ok(SubmissionReceipt {
            record_id: None,
            backend: self.backend_name().to_string(),
        })
    }
}
