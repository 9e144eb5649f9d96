use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    ApprovalStatus, ApprovalVerdict, CheckStatus, InspectionType, OperationStatus,
};

/// 生成默认UUID字符串的辅助函数
pub fn default_id() -> String {
    Uuid::new_v4().to_string()
}

/// 单个检查项的巡察结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckItemResult {
    /// 所属区域
    pub area: String,
    /// 检查项名称（匯出时按名称查找）
    pub item: String,
    /// 状态
    #[serde(default)]
    pub status: CheckStatus,
    /// 巡察时间 `HH:MM`，未填为空字符串
    #[serde(default)]
    pub time: String,
    /// 备注
    #[serde(default)]
    pub remark: String,
}

/// 表单收集结果（尚未附加身分、签名与时间戳）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub inspection_type: InspectionType,
    /// 巡察地点/穀倉编号选项，格式 `<地点>#<编号>`
    pub silo_selection: String,
    pub operation_status: OperationStatus,
    /// 巡察日期时间 `YYYY-MM-DDTHH:MM`
    pub inspection_date: String,
    pub general_notes: String,
    /// 复选的巡察点
    #[serde(default)]
    pub patrol_points: Vec<String>,
    pub check_items: Vec<CheckItemResult>,
}

/// 提交到后端的巡察纪录（由后端指派ID与提交时间）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInspectionRecord {
    pub inspection_type: InspectionType,
    pub location: String,
    /// 穀倉编号，总是以 `#` 开头
    pub silo_id: String,
    pub operation_status: OperationStatus,
    pub inspection_date: String,
    pub inspector_id: String,
    pub inspector_name: String,
    pub general_notes: String,
    /// `data:image/png;base64,...`
    pub inspector_signature: String,
    pub check_items: Vec<CheckItemResult>,
    #[serde(default)]
    pub patrol_points: Vec<String>,
    pub approval_status: ApprovalStatus,
    pub approver_id: Option<String>,
    pub approver_name: Option<String>,
    pub approval_timestamp: Option<DateTime<Utc>>,
}

/// 已存储的巡察纪录（聚合根）
///
/// 栏位名称沿用 camelCase，与既有文档格式一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default)]
    pub inspection_type: InspectionType,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub silo_id: String,
    #[serde(default)]
    pub operation_status: OperationStatus,
    #[serde(default)]
    pub inspection_date: String,
    #[serde(default)]
    pub inspector_id: String,
    #[serde(default)]
    pub inspector_name: String,
    /// 后端指派的提交时间，同一后端内严格递增
    #[serde(default)]
    pub submission_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub general_notes: String,
    #[serde(default)]
    pub inspector_signature: String,
    #[serde(default)]
    pub check_items: Vec<CheckItemResult>,
    #[serde(default)]
    pub patrol_points: Vec<String>,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    #[serde(default)]
    pub approver_id: Option<String>,
    #[serde(default)]
    pub approver_name: Option<String>,
    #[serde(default)]
    pub approval_timestamp: Option<DateTime<Utc>>,
}

impl InspectionRecord {
    /// 由后端在写入时组装：指派ID与提交时间
    pub fn from_new(id: String, new: NewInspectionRecord, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            inspection_type: new.inspection_type,
            location: new.location,
            silo_id: new.silo_id,
            operation_status: new.operation_status,
            inspection_date: new.inspection_date,
            inspector_id: new.inspector_id,
            inspector_name: new.inspector_name,
            submission_timestamp: Some(submitted_at),
            general_notes: new.general_notes,
            inspector_signature: new.inspector_signature,
            check_items: new.check_items,
            patrol_points: new.patrol_points,
            approval_status: new.approval_status,
            approver_id: new.approver_id,
            approver_name: new.approver_name,
            approval_timestamp: new.approval_timestamp,
        }
    }

    /// 是否有任一检查项为异常
    pub fn has_abnormal(&self) -> bool {
        self.check_items
            .iter()
            .any(|item| item.status == CheckStatus::Abnormal)
    }

    /// 按检查项名称查找结果
    pub fn find_item(&self, name: &str) -> Option<&CheckItemResult> {
        self.check_items.iter().find(|item| item.item == name)
    }

    /// 套用审核决定，只允许从待审核转出，审核人栏位只写一次
    ///
    /// 审核时间不早于提交时间
    pub fn apply_decision(
        &mut self,
        decision: &ApprovalDecision,
        decided_at: DateTime<Utc>,
    ) -> Result<(), ApprovalStatus> {
        let target = decision.verdict.as_status();
        if !self.approval_status.can_transition_to(&target) || self.approver_id.is_some() {
            return Err(self.approval_status.clone());
        }
        self.approval_status = target;
        self.approver_id = Some(decision.approver_id.clone());
        self.approver_name = Some(decision.approver_name.clone());
        self.approval_timestamp = Some(match self.submission_timestamp {
            Some(submitted) if submitted > decided_at => submitted,
            _ => decided_at,
        });
        Ok(())
    }
}

/// 审核决定，审核时间由后端写入时指派
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub verdict: ApprovalVerdict,
    pub approver_id: String,
    pub approver_name: String,
}

/// 后端写入回执
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    /// 文档库指派的纪录ID；试算表端点不回传ID
    pub record_id: Option<String>,
    /// 后端名称
    pub backend: String,
}

/// 纪录快照，每次写入后广播
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordsSnapshot {
    /// 单调递增的版本号
    pub revision: u64,
    pub records: Vec<InspectionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pending_record() -> InspectionRecord {
        InspectionRecord {
            id: "rec-1".to_string(),
            inspection_type: InspectionType::General,
            location: "A區".to_string(),
            silo_id: "#3".to_string(),
            operation_status: OperationStatus::None,
            inspection_date: "2024-02-10T09:30".to_string(),
            inspector_id: "abcdefgh1234".to_string(),
            inspector_name: "User-abcdefgh".to_string(),
            submission_timestamp: Some(Utc.with_ymd_and_hms(2024, 2, 10, 1, 31, 0).unwrap()),
            general_notes: String::new(),
            inspector_signature: String::new(),
            check_items: vec![],
            patrol_points: vec![],
            approval_status: ApprovalStatus::Pending,
            approver_id: None,
            approver_name: None,
            approval_timestamp: None,
        }
    }

    #[test]
    fn record_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(pending_record()).unwrap();
        assert_eq!(json["siloId"], "#3");
        assert_eq!(json["approvalStatus"], "Pending");
        assert!(json["approverId"].is_null());
    }

    #[test]
    fn record_tolerates_missing_and_unknown_fields() {
        let json = r#"{"id":"x","inspectionType":"Weekend","checkItems":[{"area":"a","item":"b","status":"Broken"}]}"#;
        let record: InspectionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.inspection_type, InspectionType::Other("Weekend".to_string()));
        assert_eq!(record.check_items[0].status, CheckStatus::Other("Broken".to_string()));
        assert_eq!(record.approval_status, ApprovalStatus::Pending);
        assert!(record.submission_timestamp.is_none());
    }

    #[test]
    fn decision_is_written_once() {
        let mut record = pending_record();
        let ts = Utc.with_ymd_and_hms(2024, 2, 10, 2, 0, 0).unwrap();
        let decision = ApprovalDecision {
            verdict: ApprovalVerdict::Approved,
            approver_id: "mgr-12345678".to_string(),
            approver_name: "Manager-mgr-1234".to_string(),
        };
        record.apply_decision(&decision, ts).unwrap();
        assert_eq!(record.approval_status, ApprovalStatus::Approved);
        assert_eq!(record.approval_timestamp, Some(ts));

        let second = ApprovalDecision { verdict: ApprovalVerdict::Rejected, ..decision };
        let later = ts + chrono::Duration::hours(1);
        assert_eq!(record.apply_decision(&second, later), Err(ApprovalStatus::Approved));
        assert_eq!(record.approver_id.as_deref(), Some("mgr-12345678"));
        assert_eq!(record.approval_timestamp, Some(ts));
    }

    #[test]
    fn approval_time_never_precedes_submission() {
        let mut record = pending_record();
        let submitted = record.submission_timestamp.unwrap();
        let skewed = submitted - chrono::Duration::minutes(5);
        let decision = ApprovalDecision {
            verdict: ApprovalVerdict::Rejected,
            approver_id: "mgr".to_string(),
            approver_name: "Manager-mgr".to_string(),
        };
        record.apply_decision(&decision, skewed).unwrap();
        assert_eq!(record.approval_timestamp, Some(submitted));
    }
}
