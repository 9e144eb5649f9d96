//! # CSV 匯出服务
//!
//! ## 业务说明
//! 把集合内的全部巡察纪录整理成一份 CSV，供试算表软件匯入
//!
//! ## 格式
//! - 固定表头 13 栏，之后每个检查项 3 栏（状态、时间、备注），顺序与检查表一致
//! - 检查项按名称查找，找不到时留三个空栏
//! - 栏位内的换行改为空格，`"` 加倍，含 `,` 或 `"` 时整栏加引号
//! - 开头加上 UTF-8 BOM，让试算表软件正确识别编码
//!
//! 整份文件在内存中组好后一次写出；写入磁盘时先写临时文件再改名

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};

use crate::models::checklist::ChecklistDefinition;
use crate::models::enums::{ApprovalStatus, CheckStatus, InspectionType, OperationStatus};
use crate::models::structs::InspectionRecord;
use crate::services::domain::session::SessionContext;
use crate::services::traits::{IInspectionStore, IUserNotifier};
use crate::utils::config::ExportConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;
use crate::{log_export_failure, log_user_operation};

/// UTF-8 BOM
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
/// 匯出文件的 MIME 类型
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8";
/// 匯出按钮默认文字
pub const EXPORT_LABEL_IDLE: &str = "匯出 CSV";
/// 匯出进行中的按钮文字
pub const EXPORT_LABEL_BUSY: &str = "匯出中...";
/// 会话未就绪
pub const EXPORT_NOT_READY_MESSAGE: &str = "應用程式尚未準備就緒。";
/// 没有纪录
pub const NOTHING_TO_EXPORT_MESSAGE: &str = "沒有可匯出的紀錄。";

/// 固定表头
pub const FIXED_HEADERS: [&str; 13] = [
    "ID",
    "巡察地點",
    "穀倉編號",
    "巡察類型",
    "作業狀態",
    "巡察日期時間",
    "巡察人ID",
    "巡察人姓名",
    "提交時間",
    "審核狀態",
    "審核人ID",
    "審核人姓名",
    "總結與處置",
];

/// 匯出的文件
#[derive(Debug, Clone, PartialEq)]
pub struct CsvDocument {
    pub filename: String,
    pub mime_type: &'static str,
    /// 含 BOM 的完整内容
    pub bytes: Vec<u8>,
}

/// CSV 栏位转义
pub fn escape_field(value: &str) -> String {
    let single_line = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let escaped = single_line.replace('"', "\"\"");
    if escaped.contains(',') || escaped.contains('"') {
        format!("\"{}\"", escaped)
    } else {
        escaped
    }
}

fn inspection_type_text(value: &InspectionType) -> &'static str {
    match value {
        InspectionType::LongHoliday => "連續假日巡察",
        InspectionType::General => "一般假日巡察",
        InspectionType::Other(_) => "N/A",
    }
}

fn operation_status_text(value: &OperationStatus) -> &'static str {
    match value {
        OperationStatus::None => "無作業",
        OperationStatus::Inbound => "進倉作業中",
        OperationStatus::Outbound => "出倉作業中",
        OperationStatus::Other(_) => "N/A",
    }
}

fn approval_status_text(value: &ApprovalStatus) -> &'static str {
    match value {
        ApprovalStatus::Pending => "待審核",
        ApprovalStatus::Approved => "已通過",
        ApprovalStatus::Rejected => "已駁回",
        ApprovalStatus::Other(_) => "N/A",
    }
}

fn check_status_text(value: &CheckStatus) -> &'static str {
    match value {
        CheckStatus::Normal => "正常",
        CheckStatus::Abnormal => "異常",
        _ => "N/A",
    }
}

/// 表头行（不含换行）
pub fn header_row(schema: &ChecklistDefinition) -> String {
    let mut cells: Vec<String> = FIXED_HEADERS.iter().map(|h| escape_field(h)).collect();
    for (_, item) in schema.iter_items() {
        cells.push(escape_field(&format!("{} - 狀態", item.name)));
        cells.push(escape_field(&format!("{} - 時間", item.name)));
        cells.push(escape_field(&format!("{} - 備註", item.name)));
    }
    cells.join(",")
}

/// 单笔纪录的资料行（不含换行）
pub fn record_row(record: &InspectionRecord, schema: &ChecklistDefinition) -> String {
    let submitted_at = record
        .submission_timestamp
        .map(time_utils::format_display)
        .unwrap_or_else(|| "N/A".to_string());

    let mut cells = vec![
        escape_field(&record.id),
        escape_field(&record.location),
        escape_field(&record.silo_id),
        escape_field(inspection_type_text(&record.inspection_type)),
        escape_field(operation_status_text(&record.operation_status)),
        escape_field(&record.inspection_date.replace('T', " ")),
        escape_field(&record.inspector_id),
        escape_field(&record.inspector_name),
        escape_field(&submitted_at),
        escape_field(approval_status_text(&record.approval_status)),
        escape_field(record.approver_id.as_deref().unwrap_or_default()),
        escape_field(record.approver_name.as_deref().unwrap_or_default()),
        escape_field(&record.general_notes),
    ];

    for (_, item) in schema.iter_items() {
        match record.find_item(&item.name) {
            Some(found) => {
                cells.push(escape_field(check_status_text(&found.status)));
                cells.push(escape_field(&found.time));
                cells.push(escape_field(&found.remark));
            }
            None => {
                debug!("[CsvExport] 纪录 {} 缺少检查项 {}", record.id, item.name);
                cells.extend(std::iter::repeat(String::new()).take(3));
            }
        }
    }
    cells.join(",")
}

/// 组装整份 CSV（含 BOM）
pub fn build_csv(records: &[InspectionRecord], schema: &ChecklistDefinition) -> Vec<u8> {
    let mut csv = String::new();
    csv.push_str(&header_row(schema));
    csv.push('\n');
    for record in records {
        csv.push_str(&record_row(record, schema));
        csv.push('\n');
    }

    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + csv.len());
    bytes.extend_from_slice(UTF8_BOM);
    bytes.extend_from_slice(csv.as_bytes());
    bytes
}

/// 匯出文件名 `<前缀>_<YYYY-MM-DD>.csv`
pub fn export_filename(prefix: &str, date: &str) -> String {
    format!("{}_{}.csv", prefix, date)
}

/// 先写同目录下的临时文件再改名，读者不会看到写了一半的文件
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}

/// CSV 匯出服务
pub struct CsvExportService {
    store: Arc<dyn IInspectionStore>,
    notifier: Arc<dyn IUserNotifier>,
    schema: ChecklistDefinition,
    config: ExportConfig,
    in_progress: AtomicBool,
}

impl CsvExportService {
    pub fn new(
        store: Arc<dyn IInspectionStore>,
        notifier: Arc<dyn IUserNotifier>,
        schema: ChecklistDefinition,
        config: ExportConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            schema,
            config,
            in_progress: AtomicBool::new(false),
        }
    }

    /// 匯出按钮当前文字
    pub fn button_label(&self) -> &'static str {
        if self.in_progress.load(Ordering::SeqCst) {
            EXPORT_LABEL_BUSY
        } else {
            EXPORT_LABEL_IDLE
        }
    }

    /// 组装 CSV 文件（不写盘）
    pub async fn export_document(&self, session: &SessionContext) -> AppResult<CsvDocument> {
        if let Err(e) = session.ensure_ready(EXPORT_NOT_READY_MESSAGE) {
            self.notifier.alert(EXPORT_NOT_READY_MESSAGE);
            return Err(e);
        }
        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Err(AppError::concurrency_error("匯出正在进行中"));
        }

        let result = self.build_document().await;
        self.in_progress.store(false, Ordering::SeqCst);

        match &result {
            Ok(doc) => {
                log_user_operation!("匯出 CSV {} ({} 字节)", doc.filename, doc.bytes.len());
            }
            Err(AppError::NothingToExport { message }) => {
                self.notifier.alert(message);
            }
            Err(e) => {
                log_export_failure!("{}", e);
                self.notifier.alert(&format!("匯出 CSV 失敗: {}", e.user_message()));
            }
        }
        result
    }

    async fn build_document(&self) -> AppResult<CsvDocument> {
        let records = self.store.load_all_records().await?;
        if records.is_empty() {
            return Err(AppError::nothing_to_export(NOTHING_TO_EXPORT_MESSAGE));
        }
        let bytes = build_csv(&records, &self.schema);
        info!("[CsvExport] 匯出 {} 笔纪录", records.len());
        Ok(CsvDocument {
            filename: export_filename(&self.config.file_prefix, &time_utils::format_date(Utc::now())),
            mime_type: CSV_MIME_TYPE,
            bytes,
        })
    }

    /// 匯出并写入目录（默认为配置的输出目录），返回文件路径
    pub async fn export_to_dir(&self, session: &SessionContext, dir: Option<&Path>) -> AppResult<PathBuf> {
        let document = self.export_document(session).await?;
        let dir = dir.unwrap_or(&self.config.output_dir);
        let path = dir.join(&document.filename);
        if let Err(e) = write_atomically(&path, &document.bytes).await {
            log_export_failure!("写入 {:?} 失败: {}", path, e);
            self.notifier.alert(&format!("匯出 CSV 失敗: {}", e.user_message()));
            return Err(e);
        }
        Ok(path)
    }
}
