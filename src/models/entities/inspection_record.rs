// 巡察纪录实体的SeaORM定义
// 检查项与巡察点以 JSON 文本存储，时间以微秒时间戳存储以保持排序精度

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::models::structs::{CheckItemResult, InspectionRecord};
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

/// 巡察纪录实体
///
/// 所有纪录存放在同一个集合路径下，`collection_path` 用于区分不同部署
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inspection_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,                              // 纪录ID
    pub collection_path: String,                 // 集合路径

    // 表头信息
    pub inspection_type: String,                 // 巡察类型
    pub location: String,                        // 巡察地点
    pub silo_id: String,                         // 穀倉编号
    pub operation_status: String,                // 作业状态
    pub inspection_date: String,                 // 巡察日期时间
    #[sea_orm(column_type = "Text")]
    pub general_notes: String,                   // 总结与处置

    // 巡察人
    pub inspector_id: String,
    pub inspector_name: String,
    #[sea_orm(column_type = "Text")]
    pub inspector_signature: String,             // 签名 data URI
    pub submission_timestamp_us: i64,            // 提交时间（微秒）

    // 明细（JSON存储）
    #[sea_orm(column_type = "Text")]
    pub check_items_json: String,
    #[sea_orm(column_type = "Text")]
    pub patrol_points_json: String,

    // 审核
    pub approval_status: String,
    #[sea_orm(nullable)]
    pub approver_id: Option<String>,
    #[sea_orm(nullable)]
    pub approver_name: Option<String>,
    #[sea_orm(nullable)]
    pub approval_timestamp_us: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// 由领域对象构建待插入的 ActiveModel
    pub fn from_record(record: &InspectionRecord, collection_path: &str) -> AppResult<Self> {
        let submitted_at = record.submission_timestamp.ok_or_else(|| {
            AppError::persistence_error(format!("纪录 {} 缺少提交时间", record.id))
        })?;
        Ok(Self {
            id: Set(record.id.clone()),
            collection_path: Set(collection_path.to_string()),
            inspection_type: Set(record.inspection_type.to_string()),
            location: Set(record.location.clone()),
            silo_id: Set(record.silo_id.clone()),
            operation_status: Set(record.operation_status.to_string()),
            inspection_date: Set(record.inspection_date.clone()),
            general_notes: Set(record.general_notes.clone()),
            inspector_id: Set(record.inspector_id.clone()),
            inspector_name: Set(record.inspector_name.clone()),
            inspector_signature: Set(record.inspector_signature.clone()),
            submission_timestamp_us: Set(time_utils::to_micros(submitted_at)),
            check_items_json: Set(serde_json::to_string(&record.check_items)?),
            patrol_points_json: Set(serde_json::to_string(&record.patrol_points)?),
            approval_status: Set(record.approval_status.to_string()),
            approver_id: Set(record.approver_id.clone()),
            approver_name: Set(record.approver_name.clone()),
            approval_timestamp_us: Set(record.approval_timestamp.map(time_utils::to_micros)),
        })
    }
}

impl TryFrom<Model> for InspectionRecord {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let check_items: Vec<CheckItemResult> = serde_json::from_str(&model.check_items_json)
            .map_err(|e| AppError::serialization_error(format!("纪录 {} 检查项解析失败: {}", model.id, e)))?;
        // 巡察点为补充栏位，旧数据解析失败时视为空
        let patrol_points: Vec<String> =
            serde_json::from_str(&model.patrol_points_json).unwrap_or_default();

        Ok(InspectionRecord {
            id: model.id,
            inspection_type: model.inspection_type.into(),
            location: model.location,
            silo_id: model.silo_id,
            operation_status: model.operation_status.into(),
            inspection_date: model.inspection_date,
            inspector_id: model.inspector_id,
            inspector_name: model.inspector_name,
            submission_timestamp: time_utils::from_micros(model.submission_timestamp_us),
            general_notes: model.general_notes,
            inspector_signature: model.inspector_signature,
            check_items,
            patrol_points,
            approval_status: model.approval_status.into(),
            approver_id: model.approver_id,
            approver_name: model.approver_name,
            approval_timestamp: model.approval_timestamp_us.and_then(time_utils::from_micros),
        })
    }
}
