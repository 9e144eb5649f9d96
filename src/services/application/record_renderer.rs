/// 巡察纪录渲染
///
/// 纪录 → HTML 卡片。模板名称以 `.html` 结尾，Tera 会自动转义所有栏位；
/// 只有通过校验的 PNG data URI 签名以原文嵌入。

use log::debug;
use serde::Serialize;
use tera::{Context, Tera};

use crate::models::enums::{ApprovalStatus, CheckStatus, InspectionType, OperationStatus};
use crate::models::structs::InspectionRecord;
use crate::services::domain::signature_pad::is_png_data_uri;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

/// 没有纪录时的列表内容
pub const EMPTY_LIST_MESSAGE: &str = "目前沒有任何巡察紀錄。";

const CARD_TEMPLATE: &str = "inspection_card.html";
const LIST_TEMPLATE: &str = "inspection_list.html";

const CARD_HTML: &str = r#"<div class="p-4 bg-white rounded-xl card border-l-8 {{ card.border_class }}" data-record-id="{{ card.id }}">
    <div class="flex justify-between items-start mb-3 border-b pb-3">
        <div>
            <span class="text-xl font-bold text-primary-blue">{{ card.location }} {{ card.silo_id }} 巡察</span>
            <span class="ml-3 text-sm font-medium px-2 py-1 rounded-full text-white {{ card.approval_class }}">{{ card.approval_text }}</span>
        </div>
        <div class="text-right">
            <p class="text-sm font-semibold">{{ card.inspection_date }}</p>
            <p class="text-xs text-gray-500">巡察人: {{ card.inspector_name }}</p>
        </div>
    </div>
    <div class="space-y-3">
        <div class="flex justify-between text-sm">
            <p class="font-medium text-gray-700">巡察類型: <span class="text-gray-900">{{ card.inspection_type }}</span></p>
            <p class="font-medium text-gray-700">作業狀態: <span class="text-gray-900">{{ card.operation_status }}</span></p>
            <p class="font-medium text-gray-700">提交時間: <span class="text-gray-900">{{ card.submitted_at }}</span></p>
        </div>
        <div class="bg-gray-50 p-3 rounded-lg">
            <h4 class="font-semibold mb-1">總結與處置：</h4>
            <p class="text-sm text-gray-800 whitespace-pre-wrap">{{ card.general_notes }}</p>
        </div>
        <details class="cursor-pointer">
            <summary class="font-bold text-primary-blue hover:text-blue-700">查看詳細巡察清單 (點擊展開)</summary>
            <div class="mt-3 overflow-x-auto">
                <table class="min-w-full bg-white border border-gray-200 rounded-lg">
                    <thead>
                        <tr class="bg-gray-100 text-left text-xs font-semibold uppercase tracking-wider text-gray-600">
                            <th class="p-2">巡查節點</th>
                            <th class="p-2">狀態</th>
                            <th class="p-2">時間</th>
                            <th class="p-2">備註/說明</th>
                        </tr>
                    </thead>
                    <tbody>
                    {%- for row in card.rows %}
                        <tr class="border-t">
                            <td class="p-2 text-sm text-gray-700">{{ row.item }}</td>
                            <td class="p-2 text-sm font-medium {% if row.abnormal %}text-abnormal-red{% else %}text-gray-700{% endif %}">{{ row.status }}</td>
                            <td class="p-2 text-sm text-gray-600">{{ row.time }}</td>
                            <td class="p-2 text-sm text-gray-600 break-words">{{ row.remark }}</td>
                        </tr>
                    {%- endfor %}
                    </tbody>
                </table>
            </div>
            <div class="mt-4 border-t pt-3">
                <h4 class="font-semibold mb-1">巡察人簽名:</h4>
                {%- if card.signature %}
                <img src="{{ card.signature | safe }}" alt="Inspector Signature" class="border p-1 bg-white rounded-md max-w-full h-auto" style="max-height: 100px;">
                {%- endif %}
                {%- if card.approver %}
                <p class="text-sm mt-2 text-gray-600">審核人: {{ card.approver.name }} ({{ card.approver.decided_at }})</p>
                {%- endif %}
            </div>
        </details>
    </div>
    <div class="mt-4 flex justify-end space-x-2">
        {%- if card.show_actions %}
        <button type="button" data-command="approve" data-record-id="{{ card.id }}" class="bg-secondary-green hover:bg-green-700 text-white text-xs font-bold py-1 px-3 rounded-md transition duration-150">通過</button>
        <button type="button" data-command="reject" data-record-id="{{ card.id }}" class="bg-abnormal-red hover:bg-red-700 text-white text-xs font-bold py-1 px-3 rounded-md transition duration-150">駁回</button>
        {%- endif %}
    </div>
</div>"#;

const LIST_HTML: &str = r#"{%- if not has_records -%}
<p class="text-center text-gray-500 p-4 bg-white rounded-xl shadow">{{ empty_message }}</p>
{%- else -%}
{%- for card in cards %}
{{ card | safe }}
{%- endfor %}
{%- endif -%}"#;

/// 巡察类型显示文字
pub fn inspection_type_label(value: &InspectionType) -> &'static str {
    match value {
        InspectionType::General => "一般假日",
        InspectionType::LongHoliday => "連續假日",
        InspectionType::Other(_) => "N/A",
    }
}

/// 作业状态显示文字
pub fn operation_status_label(value: &OperationStatus) -> &'static str {
    match value {
        OperationStatus::None => "無作業",
        OperationStatus::Inbound => "進倉",
        OperationStatus::Outbound => "出倉",
        OperationStatus::Other(_) => "N/A",
    }
}

/// 审核状态显示文字
pub fn approval_status_label(value: &ApprovalStatus) -> &'static str {
    match value {
        ApprovalStatus::Pending => "待審核",
        ApprovalStatus::Approved => "已通過",
        ApprovalStatus::Rejected => "已駁回",
        ApprovalStatus::Other(_) => "N/A",
    }
}

/// 检查项状态显示文字
pub fn check_status_label(value: &CheckStatus) -> &'static str {
    match value {
        CheckStatus::Normal => "正常",
        CheckStatus::Abnormal => "異常",
        _ => "N/A",
    }
}

fn approval_class(value: &ApprovalStatus) -> &'static str {
    match value {
        ApprovalStatus::Approved => "bg-secondary-green",
        ApprovalStatus::Rejected => "bg-abnormal-red",
        _ => "bg-yellow-500",
    }
}

#[derive(Debug, Serialize)]
struct ItemRow {
    item: String,
    status: &'static str,
    abnormal: bool,
    time: String,
    remark: String,
}

#[derive(Debug, Serialize)]
struct ApproverView {
    name: String,
    decided_at: String,
}

/// 卡片的视图模型
#[derive(Debug, Serialize)]
struct CardView {
    id: String,
    location: String,
    silo_id: String,
    border_class: &'static str,
    approval_class: &'static str,
    approval_text: &'static str,
    inspection_date: String,
    inspector_name: String,
    inspection_type: &'static str,
    operation_status: &'static str,
    submitted_at: String,
    general_notes: String,
    rows: Vec<ItemRow>,
    signature: Option<String>,
    approver: Option<ApproverView>,
    show_actions: bool,
}

impl CardView {
    fn from_record(record: &InspectionRecord, actor: Option<&str>) -> Self {
        let rows = record
            .check_items
            .iter()
            .map(|item| ItemRow {
                item: item.item.clone(),
                status: check_status_label(&item.status),
                abnormal: item.status == CheckStatus::Abnormal,
                time: if item.time.is_empty() { "N/A".to_string() } else { item.time.clone() },
                remark: if item.remark.is_empty() { "-".to_string() } else { item.remark.clone() },
            })
            .collect();

        let signature = if is_png_data_uri(&record.inspector_signature) {
            Some(record.inspector_signature.clone())
        } else {
            if !record.inspector_signature.is_empty() {
                debug!("[RecordRenderer] 纪录 {} 的签名不是 PNG data URI，略过", record.id);
            }
            None
        };

        let approver = record.approver_id.as_ref().map(|_| ApproverView {
            name: record.approver_name.clone().unwrap_or_default(),
            decided_at: record
                .approval_timestamp
                .map(time_utils::format_display)
                .unwrap_or_else(|| "N/A".to_string()),
        });

        Self {
            id: record.id.clone(),
            location: record.location.clone(),
            silo_id: record.silo_id.clone(),
            border_class: if record.has_abnormal() { "border-abnormal-red" } else { "border-primary-blue" },
            approval_class: approval_class(&record.approval_status),
            approval_text: approval_status_label(&record.approval_status),
            inspection_date: record.inspection_date.replace('T', " "),
            inspector_name: record.inspector_name.clone(),
            inspection_type: inspection_type_label(&record.inspection_type),
            operation_status: operation_status_label(&record.operation_status),
            submitted_at: record
                .submission_timestamp
                .map(time_utils::format_display)
                .unwrap_or_else(|| "N/A".to_string()),
            general_notes: if record.general_notes.is_empty() {
                "無總結說明。".to_string()
            } else {
                record.general_notes.clone()
            },
            rows,
            signature,
            approver,
            show_actions: record.approval_status.is_pending() && actor.map_or(false, |a| !a.is_empty()),
        }
    }
}

/// 纪录渲染器
pub struct RecordRenderer {
    tera: Tera,
}

impl RecordRenderer {
    pub fn new() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![(CARD_TEMPLATE, CARD_HTML), (LIST_TEMPLATE, LIST_HTML)])
            .map_err(|e| AppError::template_error(format!("添加纪录模板失败: {}", e)))?;
        Ok(Self { tera })
    }

    /// 渲染单笔纪录；`actor` 为当前登入者，存在且纪录待审核时显示审核按钮
    pub fn render_card(&self, record: &InspectionRecord, actor: Option<&str>) -> AppResult<String> {
        let mut context = Context::new();
        context.insert("card", &CardView::from_record(record, actor));
        Ok(self.tera.render(CARD_TEMPLATE, &context)?)
    }

    /// 渲染整个列表（按传入顺序）
    pub fn render_list(&self, records: &[InspectionRecord], actor: Option<&str>) -> AppResult<String> {
        let cards = records
            .iter()
            .map(|record| self.render_card(record, actor))
            .collect::<AppResult<Vec<String>>>()?;

        let mut context = Context::new();
        context.insert("has_records", &!cards.is_empty());
        context.insert("cards", &cards);
        context.insert("empty_message", EMPTY_LIST_MESSAGE);
        Ok(self.tera.render(LIST_TEMPLATE, &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::structs::CheckItemResult;
    use crate::services::domain::signature_pad::SignaturePad;
    use crate::test_support::sample_record;
    use chrono::Utc;

    #[test]
    fn abnormal_record_gets_red_border_and_actions_for_actor() {
        let renderer = RecordRenderer::new().unwrap();
        let record = sample_record("rec-1");
        let html = renderer.render_card(&record, Some("manager")).unwrap();

        assert!(html.contains("border-abnormal-red"));
        assert!(html.contains("一廠 #3 巡察"));
        assert!(html.contains("待審核"));
        assert!(html.contains(r#"data-command="approve" data-record-id="rec-1""#));
        assert!(html.contains(r#"data-command="reject" data-record-id="rec-1""#));
        assert!(html.contains("text-abnormal-red\">異常"));
    }

    #[test]
    fn no_actions_without_actor_or_when_decided() {
        let renderer = RecordRenderer::new().unwrap();
        let mut record = sample_record("rec-2");
        assert!(!renderer.render_card(&record, None).unwrap().contains("data-command"));

        record.approval_status = ApprovalStatus::Approved;
        record.approver_id = Some("mgr".into());
        record.approver_name = Some("Manager-mgr".into());
        record.approval_timestamp = Some(Utc::now());
        let html = renderer.render_card(&record, Some("manager")).unwrap();
        assert!(!html.contains("data-command"));
        assert!(html.contains("bg-secondary-green"));
        assert!(html.contains("審核人: Manager-mgr ("));
    }

    #[test]
    fn fields_are_escaped() {
        let renderer = RecordRenderer::new().unwrap();
        let mut record = sample_record("rec-3");
        record.general_notes = "<script>alert(1)</script>".into();
        record.check_items = vec![CheckItemResult {
            area: "A".into(),
            item: "<b>門</b>".into(),
            status: CheckStatus::Normal,
            time: String::new(),
            remark: String::new(),
        }];
        let html = renderer.render_card(&record, None).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;門"));
        assert!(html.contains(">N/A</td>"));
        assert!(html.contains(">-</td>"));
        assert!(html.contains("border-primary-blue"));
    }

    #[test]
    fn only_png_signatures_are_embedded() {
        let renderer = RecordRenderer::new().unwrap();
        let mut record = sample_record("rec-4");
        record.inspector_signature = SignaturePad::new(4, 4, 1.0).export_image().unwrap();
        let html = renderer.render_card(&record, None).unwrap();
        assert!(html.contains(&format!("src=\"{}\"", record.inspector_signature)));

        record.inspector_signature = "javascript:alert(1)".into();
        let html = renderer.render_card(&record, None).unwrap();
        assert!(!html.contains("<img"));
    }

    #[test]
    fn unmapped_values_show_na_and_empty_notes_placeholder() {
        let renderer = RecordRenderer::new().unwrap();
        let mut record = sample_record("rec-5");
        record.operation_status = OperationStatus::Other("Unknown".into());
        record.general_notes.clear();
        record.submission_timestamp = None;
        let html = renderer.render_card(&record, None).unwrap();
        assert!(html.contains("作業狀態: <span class=\"text-gray-900\">N/A</span>"));
        assert!(html.contains("提交時間: <span class=\"text-gray-900\">N/A</span>"));
        assert!(html.contains("無總結說明。"));
    }

    #[test]
    fn list_rendering() {
        let renderer = RecordRenderer::new().unwrap();
        let empty = renderer.render_list(&[], None).unwrap();
        assert!(empty.contains(EMPTY_LIST_MESSAGE));

        let records = vec![sample_record("b"), sample_record("a")];
        let html = renderer.render_list(&records, None).unwrap();
        let b = html.find("data-record-id=\"b\"").unwrap();
        let a = html.find("data-record-id=\"a\"").unwrap();
        assert!(b < a);
        assert!(!html.contains(EMPTY_LIST_MESSAGE));
    }
}
