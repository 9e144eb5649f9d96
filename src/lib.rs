/// 穀倉假日巡察系统 - 核心库
pub mod models;
pub mod utils;
pub mod logging;
pub mod services;
pub mod app_state;
pub mod commands;

// 重新导出常用类型，方便使用
pub use models::*;
pub use utils::{AppError, AppResult, AppConfig};
pub use services::*;
pub use app_state::{AppState, SystemStatus, init_app_state};

/// 测试共用的样本资料
#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::models::checklist::ChecklistDefinition;
    use crate::models::enums::{ApprovalStatus, CheckStatus, InspectionType, OperationStatus};
    use crate::models::structs::{CheckItemResult, InspectionRecord, NewInspectionRecord};

    /// 一廠 #3 的待审核纪录，第二个检查项为异常
    pub fn sample_new_record() -> NewInspectionRecord {
        let schema = ChecklistDefinition::grain_silo_default();
        let check_items = schema
            .iter_items()
            .enumerate()
            .map(|(index, (section, item))| CheckItemResult {
                area: section.area.clone(),
                item: item.name.clone(),
                status: if index == 1 { CheckStatus::Abnormal } else { CheckStatus::Normal },
                time: "09:30".to_string(),
                remark: if index == 1 { "門未上鎖".to_string() } else { String::new() },
            })
            .collect();

        NewInspectionRecord {
            inspection_type: InspectionType::General,
            location: "一廠".to_string(),
            silo_id: "#3".to_string(),
            operation_status: OperationStatus::None,
            inspection_date: "2024-02-10T09:30".to_string(),
            inspector_id: "inspector-uid-1234".to_string(),
            inspector_name: "User-inspecto".to_string(),
            general_notes: "一切正常".to_string(),
            inspector_signature: String::new(),
            check_items,
            patrol_points: vec!["北側".to_string(), "南側".to_string()],
            approval_status: ApprovalStatus::Pending,
            approver_id: None,
            approver_name: None,
            approval_timestamp: None,
        }
    }

    /// 已存储的样本纪录
    pub fn sample_record(id: &str) -> InspectionRecord {
        InspectionRecord::from_new(id.to_string(), sample_new_record(), Utc::now())
    }
}
