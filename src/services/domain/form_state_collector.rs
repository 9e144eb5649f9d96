/// 表单状态收集
///
/// 以检查表为驱动读取每一个检查项的控件（状态、时间、备注），
/// 不依赖控件的查找顺序。缺少控件的检查项降级为"不适用"，不会让整次收集失败。

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::models::checklist::ChecklistDefinition;
use crate::models::enums::{CheckStatus, InspectionType, OperationStatus};
use crate::models::structs::{CheckItemResult, DraftRecord};
use crate::services::domain::signature_pad::SignaturePad;
use crate::utils::time_utils::{FORM_DATETIME_FORMAT, ITEM_TIME_FORMAT};

/// 提交按钮的默认文字
pub const SUBMIT_LABEL_IDLE: &str = "提交巡察紀錄";
/// 提交进行中的按钮文字
pub const SUBMIT_LABEL_BUSY: &str = "提交中...";

/// 单个检查项的控件值，None 表示未选择/未填写
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemControls {
    pub status: Option<CheckStatus>,
    pub time: Option<String>,
    pub remark: Option<String>,
}

/// 表单控件读取接口（检查项ID → 控件值）
pub trait IFormControls {
    /// 检查项的控件；控件不存在时返回 None
    fn item_controls(&self, item_id: &str) -> Option<ItemControls>;
    fn inspection_type(&self) -> InspectionType;
    fn silo_selection(&self) -> String;
    fn operation_status(&self) -> OperationStatus;
    fn inspection_date(&self) -> String;
    fn general_notes(&self) -> String;
    fn patrol_points(&self) -> Vec<String>;
}

/// 按检查表顺序收集表单内容
pub fn collect(schema: &ChecklistDefinition, controls: &dyn IFormControls) -> DraftRecord {
    let check_items = schema
        .iter_items()
        .map(|(section, item)| match controls.item_controls(&item.id) {
            Some(c) => CheckItemResult {
                area: section.area.clone(),
                item: item.name.clone(),
                status: c.status.unwrap_or(CheckStatus::Normal),
                time: c.time.unwrap_or_default(),
                remark: c.remark.map(|r| r.trim().to_string()).unwrap_or_default(),
            },
            None => CheckItemResult {
                area: section.area.clone(),
                item: item.name.clone(),
                status: CheckStatus::NotApplicable,
                time: String::new(),
                remark: String::new(),
            },
        })
        .collect();

    DraftRecord {
        inspection_type: controls.inspection_type(),
        silo_selection: controls.silo_selection(),
        operation_status: controls.operation_status(),
        inspection_date: controls.inspection_date(),
        general_notes: controls.general_notes().trim().to_string(),
        patrol_points: controls.patrol_points(),
        check_items,
    }
}

/// 表单控件的内存模型
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub inspection_type: InspectionType,
    pub silo_selection: String,
    pub operation_status: OperationStatus,
    pub inspection_date: String,
    pub general_notes: String,
    pub patrol_points: Vec<String>,
    items: HashMap<String, ItemControls>,
}

impl FormState {
    /// 按检查表渲染默认值：状态正常、时间为当前时刻、日期时间为现在
    pub fn new(schema: &ChecklistDefinition, now: DateTime<FixedOffset>) -> Self {
        let time = now.format(ITEM_TIME_FORMAT).to_string();
        let items = schema
            .iter_items()
            .map(|(_, item)| {
                (
                    item.id.clone(),
                    ItemControls {
                        status: Some(CheckStatus::Normal),
                        time: Some(time.clone()),
                        remark: Some(String::new()),
                    },
                )
            })
            .collect();

        Self {
            inspection_type: InspectionType::General,
            silo_selection: String::new(),
            operation_status: OperationStatus::None,
            inspection_date: now.format(FORM_DATETIME_FORMAT).to_string(),
            general_notes: String::new(),
            patrol_points: Vec::new(),
            items,
        }
    }

    /// 重设为默认值（提交成功后调用）
    pub fn reset_to_defaults(&mut self, schema: &ChecklistDefinition, now: DateTime<FixedOffset>) {
        *self = Self::new(schema, now);
    }

    fn item_mut(&mut self, item_id: &str) -> &mut ItemControls {
        self.items.entry(item_id.to_string()).or_default()
    }

    pub fn set_item_status(&mut self, item_id: &str, status: CheckStatus) {
        self.item_mut(item_id).status = Some(status);
    }

    pub fn set_item_time(&mut self, item_id: &str, time: impl Into<String>) {
        self.item_mut(item_id).time = Some(time.into());
    }

    pub fn set_item_remark(&mut self, item_id: &str, remark: impl Into<String>) {
        self.item_mut(item_id).remark = Some(remark.into());
    }

    /// 清除某个检查项的状态选择
    pub fn unset_item_status(&mut self, item_id: &str) {
        self.item_mut(item_id).status = None;
    }

    /// 移除检查项的全部控件（模拟控件未渲染）
    pub fn remove_item(&mut self, item_id: &str) {
        self.items.remove(item_id);
    }

    pub fn item(&self, item_id: &str) -> Option<&ItemControls> {
        self.items.get(item_id)
    }
}

impl IFormControls for FormState {
    fn item_controls(&self, item_id: &str) -> Option<ItemControls> {
        self.items.get(item_id).cloned()
    }

    fn inspection_type(&self) -> InspectionType {
        self.inspection_type.clone()
    }

    fn silo_selection(&self) -> String {
        self.silo_selection.clone()
    }

    fn operation_status(&self) -> OperationStatus {
        self.operation_status.clone()
    }

    fn inspection_date(&self) -> String {
        self.inspection_date.clone()
    }

    fn general_notes(&self) -> String {
        self.general_notes.clone()
    }

    fn patrol_points(&self) -> Vec<String> {
        self.patrol_points.clone()
    }
}

/// 提交按钮状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub disabled: bool,
    pub label: String,
}

impl Default for SubmitControl {
    fn default() -> Self {
        Self {
            disabled: false,
            label: SUBMIT_LABEL_IDLE.to_string(),
        }
    }
}

impl SubmitControl {
    pub fn set_busy(&mut self) {
        self.disabled = true;
        self.label = SUBMIT_LABEL_BUSY.to_string();
    }

    pub fn set_idle(&mut self) {
        self.disabled = false;
        self.label = SUBMIT_LABEL_IDLE.to_string();
    }
}

/// 一个表单会话：控件、签名板与提交按钮，由同一个使用者独占
#[derive(Debug, Clone)]
pub struct InspectionForm {
    pub schema: ChecklistDefinition,
    pub state: FormState,
    pub signature: SignaturePad,
    pub submit_control: SubmitControl,
}

impl InspectionForm {
    pub fn new(schema: ChecklistDefinition, signature: SignaturePad, now: DateTime<FixedOffset>) -> Self {
        let state = FormState::new(&schema, now);
        Self {
            schema,
            state,
            signature,
            submit_control: SubmitControl::default(),
        }
    }

    /// 收集当前草稿
    pub fn collect(&self) -> DraftRecord {
        collect(&self.schema, &self.state)
    }

    /// 草稿重设为默认值并清空签名
    pub fn reset(&mut self, now: DateTime<FixedOffset>) {
        self.state.reset_to_defaults(&self.schema, now);
        self.signature.clear();
    }
}
