/// 审核控制器
///
/// 负责将已存储纪录从"待审核"转为"已通过"或"已驳回"，是唯一可以修改审核栏位的组件。
/// 流程：会话检查 → 读取纪录 → 状态检查 → 权限检查 → 确认对话框 → 文档库比较并写入

use std::sync::Arc;

use log::{debug, info, warn};

use crate::log_user_operation;
use crate::models::enums::ApprovalVerdict;
use crate::models::structs::{ApprovalDecision, InspectionRecord};
use crate::services::domain::session::{SessionContext, SESSION_NOT_READY_FOR_APPROVAL};
use crate::services::traits::{IConfirmationPrompt, IInspectionStore, IUserNotifier};
use crate::utils::config::ApprovalConfig;
use crate::utils::error::{AppError, AppResult};

/// 审核成功提示
pub const APPROVAL_SUCCESS_MESSAGE: &str = "審核狀態更新成功！";

/// 审核结果
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    /// 已写入，携带更新后的纪录
    Applied(InspectionRecord),
    /// 使用者在确认对话框中取消
    Cancelled,
}

pub struct ApprovalController {
    store: Arc<dyn IInspectionStore>,
    prompt: Arc<dyn IConfirmationPrompt>,
    notifier: Arc<dyn IUserNotifier>,
    config: ApprovalConfig,
}

impl ApprovalController {
    pub fn new(
        store: Arc<dyn IInspectionStore>,
        prompt: Arc<dyn IConfirmationPrompt>,
        notifier: Arc<dyn IUserNotifier>,
        config: ApprovalConfig,
    ) -> Self {
        Self { store, prompt, notifier, config }
    }

    pub async fn approve(&self, record_id: &str, session: &SessionContext) -> AppResult<ApprovalOutcome> {
        self.decide(record_id, ApprovalVerdict::Approved, session).await
    }

    pub async fn reject(&self, record_id: &str, session: &SessionContext) -> AppResult<ApprovalOutcome> {
        self.decide(record_id, ApprovalVerdict::Rejected, session).await
    }

    /// 执行审核；失败时提示 `審核更新失敗: <原因>` 并返回错误
    pub async fn decide(
        &self,
        record_id: &str,
        verdict: ApprovalVerdict,
        session: &SessionContext,
    ) -> AppResult<ApprovalOutcome> {
        if let Err(e) = session.ensure_ready(SESSION_NOT_READY_FOR_APPROVAL) {
            self.notifier.alert(SESSION_NOT_READY_FOR_APPROVAL);
            return Err(e);
        }

        match self.try_decide(record_id, verdict, session).await {
            Ok(ApprovalOutcome::Applied(record)) => {
                log_user_operation!(
                    "纪录 {} 审核为 {} (审核人 {})",
                    record_id,
                    record.approval_status,
                    session.short_id()
                );
                self.notifier.alert(APPROVAL_SUCCESS_MESSAGE);
                Ok(ApprovalOutcome::Applied(record))
            }
            Ok(ApprovalOutcome::Cancelled) => {
                debug!("[ApprovalController] 使用者取消审核 {}", record_id);
                Ok(ApprovalOutcome::Cancelled)
            }
            Err(e) => {
                warn!("[ApprovalController] 纪录 {} 审核失败: {}", record_id, e);
                self.notifier.alert(&format!("審核更新失敗: {}", e.user_message()));
                Err(e)
            }
        }
    }

    async fn try_decide(
        &self,
        record_id: &str,
        verdict: ApprovalVerdict,
        session: &SessionContext,
    ) -> AppResult<ApprovalOutcome> {
        let record = self
            .store
            .load_record(record_id)
            .await?
            .ok_or_else(|| AppError::not_found_error("InspectionRecord", format!("找不到紀錄 {}", record_id)))?;

        // 确认对话框之前先拒绝已审核的纪录
        if !record.approval_status.is_pending() {
            return Err(AppError::already_decided(record_id, record.approval_status.to_string()));
        }

        self.authorize(session)?;

        let question = format!("確定要將此紀錄設為 {} 嗎？", verdict.action_label());
        if !self.prompt.confirm(&question) {
            return Ok(ApprovalOutcome::Cancelled);
        }

        let decision = ApprovalDecision {
            verdict,
            approver_id: session.user_id().to_string(),
            approver_name: session.approver_name(),
        };
        let updated = self.store.apply_approval(record_id, &decision).await?;
        info!("[ApprovalController] 纪录 {} → {}", record_id, updated.approval_status);
        Ok(ApprovalOutcome::Applied(updated))
    }

    /// 白名单非空时只有名单内的使用者可以审核
    fn authorize(&self, session: &SessionContext) -> AppResult<()> {
        if self.config.approver_ids.is_empty() {
            if session.is_anonymous() {
                warn!("[ApprovalController] 匿名使用者 {} 正在执行审核，正式环境应限制审核权限", session.short_id());
            }
            return Ok(());
        }
        if self.config.approver_ids.iter().any(|id| id == session.user_id()) {
            Ok(())
        } else {
            Err(AppError::authorization_error("您沒有審核權限。"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{ApprovalStatus, AuthMethod};
    use crate::services::infrastructure::persistence::MemoryInspectionStore;
    use crate::services::traits::{MockIConfirmationPrompt, MockIUserNotifier};
    use crate::test_support::sample_new_record;
    use mockall::predicate::eq;

    fn notifier_expecting(message: &'static str) -> Arc<MockIUserNotifier> {
        let mut notifier = MockIUserNotifier::new();
        notifier.expect_alert().with(eq(message)).times(1).return_const(());
        Arc::new(notifier)
    }

    fn prompt_answering(answer: bool, times: usize) -> Arc<MockIConfirmationPrompt> {
        let mut prompt = MockIConfirmationPrompt::new();
        prompt.expect_confirm().times(times).return_const(answer);
        Arc::new(prompt)
    }

    async fn store_with_record() -> (Arc<MemoryInspectionStore>, String) {
        let store = Arc::new(MemoryInspectionStore::new("artifacts/test/public/data/inspections"));
        let record = store.create_record(sample_new_record()).await.unwrap();
        (store, record.id)
    }

    #[tokio::test]
    async fn approve_writes_approver_fields() {
        let (store, id) = store_with_record().await;
        let controller = ApprovalController::new(
            store.clone(),
            prompt_answering(true, 1),
            notifier_expecting(APPROVAL_SUCCESS_MESSAGE),
            ApprovalConfig::default(),
        );
        let session = SessionContext::new("manager-uid-0001", AuthMethod::CustomToken);

        let outcome = controller.approve(&id, &session).await.unwrap();
        let ApprovalOutcome::Applied(record) = outcome else {
            panic!("应该写入审核结果");
        };
        assert_eq!(record.approval_status, ApprovalStatus::Approved);
        assert_eq!(record.approver_id.as_deref(), Some("manager-uid-0001"));
        assert_eq!(record.approver_name.as_deref(), Some("Manager-manager-"));
        assert!(record.approval_timestamp.unwrap() >= record.submission_timestamp.unwrap());
    }

    #[tokio::test]
    async fn declining_confirmation_leaves_record_pending() {
        let (store, id) = store_with_record().await;
        let mut notifier = MockIUserNotifier::new();
        notifier.expect_alert().times(0);
        let controller = ApprovalController::new(
            store.clone(),
            prompt_answering(false, 1),
            Arc::new(notifier),
            ApprovalConfig::default(),
        );
        let session = SessionContext::new("manager-uid-0001", AuthMethod::CustomToken);

        let outcome = controller.reject(&id, &session).await.unwrap();
        assert_eq!(outcome, ApprovalOutcome::Cancelled);
        let stored = store.load_record(&id).await.unwrap().unwrap();
        assert_eq!(stored.approval_status, ApprovalStatus::Pending);
        assert!(stored.approver_id.is_none());
    }

    #[tokio::test]
    async fn second_decision_is_already_decided_without_prompt() {
        let (store, id) = store_with_record().await;
        let session = SessionContext::new("manager-uid-0001", AuthMethod::CustomToken);
        let first = ApprovalController::new(
            store.clone(),
            prompt_answering(true, 1),
            notifier_expecting(APPROVAL_SUCCESS_MESSAGE),
            ApprovalConfig::default(),
        );
        first.approve(&id, &session).await.unwrap();
        let approved = store.load_record(&id).await.unwrap().unwrap();

        let mut notifier = MockIUserNotifier::new();
        notifier
            .expect_alert()
            .withf(|m| m.starts_with("審核更新失敗: "))
            .times(1)
            .return_const(());
        let second = ApprovalController::new(
            store.clone(),
            prompt_answering(true, 0),
            Arc::new(notifier),
            ApprovalConfig::default(),
        );
        let other = SessionContext::new("someone-else", AuthMethod::CustomToken);
        let err = second.reject(&id, &other).await.unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_DECIDED");

        let after = store.load_record(&id).await.unwrap().unwrap();
        assert_eq!(after.approver_id, approved.approver_id);
        assert_eq!(after.approval_timestamp, approved.approval_timestamp);
        assert_eq!(after.approval_status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn allow_list_rejects_other_users() {
        let (store, id) = store_with_record().await;
        let mut notifier = MockIUserNotifier::new();
        notifier.expect_alert().times(1).return_const(());
        let controller = ApprovalController::new(
            store.clone(),
            prompt_answering(true, 0),
            Arc::new(notifier),
            ApprovalConfig { approver_ids: vec!["boss".to_string()] },
        );
        let session = SessionContext::new("intern", AuthMethod::CustomToken);
        let err = controller.approve(&id, &session).await.unwrap_err();
        assert_eq!(err.error_code(), "AUTHORIZATION_ERROR");
    }

    #[tokio::test]
    async fn signed_out_session_is_refused() {
        let (store, id) = store_with_record().await;
        let controller = ApprovalController::new(
            store,
            prompt_answering(true, 0),
            notifier_expecting(SESSION_NOT_READY_FOR_APPROVAL),
            ApprovalConfig::default(),
        );
        let session = SessionContext::new("manager", AuthMethod::CustomToken);
        session.sign_out();
        let err = controller.approve(&id, &session).await.unwrap_err();
        assert_eq!(err.error_code(), "AUTHENTICATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let store = Arc::new(MemoryInspectionStore::new("c"));
        let mut notifier = MockIUserNotifier::new();
        notifier.expect_alert().times(1).return_const(());
        let controller = ApprovalController::new(
            store,
            prompt_answering(true, 0),
            Arc::new(notifier),
            ApprovalConfig::default(),
        );
        let session = SessionContext::new("manager", AuthMethod::CustomToken);
        let err = controller.approve("missing", &session).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND_ERROR");
    }
}
