//! # 模型枚举类型模块
//!
//! ## 业务作用
//! 本模块定义了巡察系统中使用的各种枚举类型，包括：
//! - **检查项状态**: 正常 / 异常 / 不适用
//! - **表头选项**: 巡察类型、作业状态
//! - **审核状态**: 待审核 / 已通过 / 已驳回
//! - **流程状态**: 提交管线的状态
//!
//! ## 设计原则
//! - **字符串存储**: 存储格式与原有文档保持一致（如 `Normal`、`NA`、`Pending`）
//! - **容错读取**: 读到无法识别的字符串时保留为 `Other(原值)`，展示时显示 `N/A`
//!
//! ## Rust知识点
//! - **serde from/into**: 通过 `String` 中转，实现宽松的反序列化
//! - **trait实现**: Display、FromStr、Default等trait

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// 为"字符串存储 + Other 容错"的枚举生成 Display / FromStr / From<String> / Into<String>
macro_rules! string_backed_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $($name::$variant => $text,)+
                    $name::Other(s) => s.as_str(),
                };
                write!(f, "{}", s)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Ok($name::Other(s.to_string())),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($text => $name::$variant,)+
                    _ => $name::Other(s),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }
    };
}

/// 检查项状态
///
/// 存储字符串分别为 `Normal`、`Abnormal`、`NA`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckStatus {
    /// 正常
    Normal,
    /// 异常
    Abnormal,
    /// 不适用（表单上没有对应的控件）
    NotApplicable,
    /// 无法识别的存储值
    Other(String),
}

impl Default for CheckStatus {
    fn default() -> Self {
        CheckStatus::Normal
    }
}

string_backed_enum!(CheckStatus {
    Normal => "Normal",
    Abnormal => "Abnormal",
    NotApplicable => "NA",
});

/// 巡察类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InspectionType {
    /// 一般假日
    General,
    /// 连续假日
    LongHoliday,
    Other(String),
}

impl Default for InspectionType {
    fn default() -> Self {
        InspectionType::General
    }
}

string_backed_enum!(InspectionType {
    General => "General",
    LongHoliday => "LongHoliday",
});

/// 码头作业状态
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationStatus {
    /// 无作业
    None,
    /// 进仓作业中
    Inbound,
    /// 出仓作业中
    Outbound,
    Other(String),
}

impl Default for OperationStatus {
    fn default() -> Self {
        OperationStatus::None
    }
}

string_backed_enum!(OperationStatus {
    None => "None",
    Inbound => "Inbound",
    Outbound => "Outbound",
});

/// 审核状态
///
/// 只允许 `Pending → Approved` 或 `Pending → Rejected`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApprovalStatus {
    /// 待审核
    Pending,
    /// 已通过
    Approved,
    /// 已驳回
    Rejected,
    Other(String),
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        ApprovalStatus::Pending
    }
}

string_backed_enum!(ApprovalStatus {
    Pending => "Pending",
    Approved => "Approved",
    Rejected => "Rejected",
});

impl ApprovalStatus {
    /// 是否仍可审核
    pub fn is_pending(&self) -> bool {
        matches!(self, ApprovalStatus::Pending)
    }

    /// 检查状态转换是否合法
    pub fn can_transition_to(&self, target: &ApprovalStatus) -> bool {
        matches!(
            (self, target),
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
                | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
        )
    }
}

/// 审核决定（只能是通过或驳回）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalVerdict {
    Approved,
    Rejected,
}

impl ApprovalVerdict {
    /// 对应的审核状态
    pub fn as_status(&self) -> ApprovalStatus {
        match self {
            ApprovalVerdict::Approved => ApprovalStatus::Approved,
            ApprovalVerdict::Rejected => ApprovalStatus::Rejected,
        }
    }

    /// 确认对话框中的动作文字
    pub fn action_label(&self) -> &'static str {
        match self {
            ApprovalVerdict::Approved => "通過",
            ApprovalVerdict::Rejected => "駁回",
        }
    }

    /// 前端按钮上的指令名称
    pub fn command_name(&self) -> &'static str {
        match self {
            ApprovalVerdict::Approved => "approve",
            ApprovalVerdict::Rejected => "reject",
        }
    }
}

impl FromStr for ApprovalVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" | "Approved" => Ok(ApprovalVerdict::Approved),
            "reject" | "Rejected" => Ok(ApprovalVerdict::Rejected),
            _ => Err(format!("无效的审核决定: {}", s)),
        }
    }
}

/// 检查项类别 A..E，对应表单上的五个区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    A,
    B,
    C,
    D,
    E,
}

/// 提交管线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// 空闲
    Idle,
    /// 校验中
    Validating,
    /// 提交中
    Submitting,
    /// 上次提交成功
    Succeeded,
    /// 上次提交失败（可重试）
    Failed,
}

impl Default for PipelineState {
    fn default() -> Self {
        PipelineState::Idle
    }
}

impl PipelineState {
    /// 是否有提交正在进行
    pub fn is_busy(&self) -> bool {
        matches!(self, PipelineState::Validating | PipelineState::Submitting)
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Idle => "Idle",
            PipelineState::Validating => "Validating",
            PipelineState::Submitting => "Submitting",
            PipelineState::Succeeded => "Succeeded",
            PipelineState::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// 登入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    /// 宿主注入的自定义令牌
    CustomToken,
    /// 匿名登入
    Anonymous,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_status_uses_stored_strings() {
        assert_eq!(CheckStatus::NotApplicable.to_string(), "NA");
        assert_eq!(serde_json::to_string(&CheckStatus::Abnormal).unwrap(), "\"Abnormal\"");
        let parsed: CheckStatus = serde_json::from_str("\"NA\"").unwrap();
        assert_eq!(parsed, CheckStatus::NotApplicable);
    }

    #[test]
    fn unexpected_strings_are_kept() {
        let parsed: ApprovalStatus = serde_json::from_str("\"Escalated\"").unwrap();
        assert_eq!(parsed, ApprovalStatus::Other("Escalated".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"Escalated\"");
        assert!(!parsed.is_pending());
    }

    #[test]
    fn approval_transitions_only_leave_pending() {
        assert!(ApprovalStatus::Pending.can_transition_to(&ApprovalStatus::Approved));
        assert!(ApprovalStatus::Pending.can_transition_to(&ApprovalStatus::Rejected));
        assert!(!ApprovalStatus::Approved.can_transition_to(&ApprovalStatus::Rejected));
        assert!(!ApprovalStatus::Rejected.can_transition_to(&ApprovalStatus::Pending));
    }

    #[test]
    fn verdict_parses_command_names() {
        assert_eq!("approve".parse::<ApprovalVerdict>().unwrap(), ApprovalVerdict::Approved);
        assert_eq!("reject".parse::<ApprovalVerdict>().unwrap().action_label(), "駁回");
        assert!("maybe".parse::<ApprovalVerdict>().is_err());
    }
}
