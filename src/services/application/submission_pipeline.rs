/// 提交管线
///
/// 状态：Idle → Validating → Submitting → Succeeded | Failed
/// - 校验失败回到 Idle，不呼叫后端
/// - Failed 可以直接再次提交（重试），草稿保持不变
/// - 同一时间只允许一笔提交进行中

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::models::enums::{ApprovalStatus, PipelineState};
use crate::models::structs::{DraftRecord, NewInspectionRecord, SubmissionReceipt};
use crate::services::domain::form_state_collector::{InspectionForm, SubmitControl};
use crate::services::domain::session::{SessionContext, SESSION_NOT_READY_MESSAGE};
use crate::services::traits::{ISubmissionBackend, IUserNotifier};
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;
use crate::{log_submission_failure, log_user_operation};

/// 地点/日期未填写
pub const MISSING_HEADER_MESSAGE: &str = "請填寫巡察地點/穀倉編號和巡察日期/時間！";
/// 尚未签名
pub const MISSING_SIGNATURE_MESSAGE: &str = "請先進行電子簽名！";
/// 提交成功
pub const SUBMIT_SUCCESS_MESSAGE: &str = "巡察紀錄提交成功！";

pub struct SubmissionPipeline {
    backend: Arc<dyn ISubmissionBackend>,
    notifier: Arc<dyn IUserNotifier>,
    state: Mutex<PipelineState>,
}

/// 拆分 `<地点>#<编号>`；缺少 `#` 时编号为空，穀倉编号只剩 `#`
pub fn split_silo_selection(selection: &str) -> (String, String) {
    let mut parts = selection.split('#');
    let location = parts.next().unwrap_or_default().to_string();
    let silo = parts.next().unwrap_or_default();
    (location, format!("#{}", silo))
}

/// 由草稿、会话与签名组装待写入的纪录
pub fn build_record(draft: DraftRecord, session: &SessionContext, signature: String) -> NewInspectionRecord {
    let (location, silo_id) = split_silo_selection(&draft.silo_selection);
    NewInspectionRecord {
        inspection_type: draft.inspection_type,
        location,
        silo_id,
        operation_status: draft.operation_status,
        inspection_date: draft.inspection_date,
        inspector_id: session.user_id().to_string(),
        inspector_name: session.inspector_name(),
        general_notes: draft.general_notes,
        inspector_signature: signature,
        check_items: draft.check_items,
        patrol_points: draft.patrol_points,
        approval_status: ApprovalStatus::Pending,
        approver_id: None,
        approver_name: None,
        approval_timestamp: None,
    }
}

/// 后端请求进行中
///
/// 请求 future 被丢弃时，Drop 把状态设为 Failed 并恢复提交按钮
struct InFlight<'a> {
    pipeline: &'a SubmissionPipeline,
    control: &'a mut SubmitControl,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn start(pipeline: &'a SubmissionPipeline, control: &'a mut SubmitControl) -> AppResult<Self> {
        pipeline.set_state(PipelineState::Submitting)?;
        control.set_busy();
        Ok(Self { pipeline, control, finished: false })
    }

    fn finish(mut self, next: PipelineState) -> AppResult<()> {
        self.finished = true;
        self.control.set_idle();
        self.pipeline.set_state(next)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("[SubmissionPipeline] 提交在等待后端时被取消");
        self.control.set_idle();
        if let Err(e) = self.pipeline.set_state(PipelineState::Failed) {
            warn!("[SubmissionPipeline] 无法恢复提交状态: {}", e);
        }
    }
}

impl SubmissionPipeline {
    pub fn new(backend: Arc<dyn ISubmissionBackend>, notifier: Arc<dyn IUserNotifier>) -> Self {
        Self {
            backend,
            notifier,
            state: Mutex::new(PipelineState::Idle),
        }
    }

    /// 当前状态
    pub fn state(&self) -> PipelineState {
        self.state.lock().map(|s| *s).unwrap_or(PipelineState::Failed)
    }

    fn set_state(&self, next: PipelineState) -> AppResult<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::concurrency_error("提交状态锁已损坏"))?;
        debug!("[SubmissionPipeline] {} → {}", *guard, next);
        *guard = next;
        Ok(())
    }

    /// 进入 Validating；已有提交进行中时拒绝
    fn begin(&self) -> AppResult<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::concurrency_error("提交状态锁已损坏"))?;
        if guard.is_busy() {
            return Err(AppError::concurrency_error("已有提交正在进行中"));
        }
        *guard = PipelineState::Validating;
        Ok(())
    }

    fn reject_validation(&self, message: &str) -> AppResult<SubmissionReceipt> {
        self.notifier.alert(message);
        self.set_state(PipelineState::Idle)?;
        Err(AppError::validation_error(message))
    }

    /// 提交表单
    ///
    /// 成功时重设草稿与签名；失败时保留草稿以便重试
    pub async fn submit(&self, session: &SessionContext, form: &mut InspectionForm) -> AppResult<SubmissionReceipt> {
        if let Err(e) = session.ensure_ready(SESSION_NOT_READY_MESSAGE) {
            self.notifier.alert(SESSION_NOT_READY_MESSAGE);
            return Err(e);
        }
        self.begin()?;

        let draft = form.collect();
        if draft.silo_selection.is_empty() || draft.inspection_date.is_empty() {
            return self.reject_validation(MISSING_HEADER_MESSAGE);
        }
        if form.signature.is_blank() {
            return self.reject_validation(MISSING_SIGNATURE_MESSAGE);
        }
        let signature = match form.signature.export_image() {
            Ok(uri) => uri,
            Err(e) => {
                self.notifier.alert(&format!("提交失敗: {}", e.user_message()));
                self.set_state(PipelineState::Idle)?;
                return Err(e);
            }
        };

        let record = build_record(draft, session, signature);
        let in_flight = InFlight::start(self, &mut form.submit_control)?;
        let result = self.backend.submit_record(&record).await;

        match result {
            Ok(receipt) => {
                in_flight.finish(PipelineState::Succeeded)?;
                log_user_operation!(
                    "提交巡察纪录 {} {} 到 {}",
                    record.location,
                    record.silo_id,
                    self.backend.backend_name()
                );
                self.notifier.alert(SUBMIT_SUCCESS_MESSAGE);
                form.reset(time_utils::now_local());
                info!("[SubmissionPipeline] 提交成功: {:?}", receipt.record_id);
                Ok(receipt)
            }
            Err(e) => {
                in_flight.finish(PipelineState::Failed)?;
                log_submission_failure!("{} 提交失败: {}", self.backend.backend_name(), e);
                self.notifier.alert(&format!("提交失敗: {}", e.user_message()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checklist::ChecklistDefinition;
    use crate::models::enums::{AuthMethod, CheckStatus, InspectionType, OperationStatus};
    use crate::services::domain::form_state_collector::SUBMIT_LABEL_IDLE;
    use crate::services::domain::signature_pad::{PointerPosition, SignaturePad};
    use crate::services::traits::{MockISubmissionBackend, MockIUserNotifier};
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use tokio::sync::Notify;

    fn signed_form() -> InspectionForm {
        let mut form = InspectionForm::new(
            ChecklistDefinition::grain_silo_default(),
            SignaturePad::new(60, 20, 1.0),
            time_utils::now_local(),
        );
        form.state.silo_selection = "一廠#3".to_string();
        form.state.general_notes = "  一切正常  ".to_string();
        form.signature.start_stroke(PointerPosition::Mouse { offset_x: 5.0, offset_y: 5.0 });
        form.signature.extend_stroke(PointerPosition::Mouse { offset_x: 40.0, offset_y: 12.0 });
        form.signature.end_stroke();
        form
    }

    fn session() -> SessionContext {
        SessionContext::new("inspector-uid-1234", AuthMethod::CustomToken)
    }

    fn notifier_expecting(message: &'static str) -> Arc<MockIUserNotifier> {
        let mut notifier = MockIUserNotifier::new();
        notifier.expect_alert().with(eq(message)).times(1).return_const(());
        Arc::new(notifier)
    }

    fn backend_never_called() -> Arc<MockISubmissionBackend> {
        let mut backend = MockISubmissionBackend::new();
        backend.expect_submit_record().times(0);
        backend.expect_backend_name().return_const("mock");
        Arc::new(backend)
    }

    #[test]
    fn silo_selection_split() {
        assert_eq!(split_silo_selection("一廠#3"), ("一廠".to_string(), "#3".to_string()));
        assert_eq!(split_silo_selection("二廠"), ("二廠".to_string(), "#".to_string()));
        assert_eq!(split_silo_selection("A#1#2"), ("A".to_string(), "#1".to_string()));
    }

    #[tokio::test]
    async fn successful_submit_resets_form() {
        let mut backend = MockISubmissionBackend::new();
        backend.expect_backend_name().return_const("mock");
        backend
            .expect_submit_record()
            .withf(|r| {
                r.location == "一廠"
                    && r.silo_id == "#3"
                    && r.inspector_name == "User-inspecto"
                    && r.general_notes == "一切正常"
                    && r.approval_status == ApprovalStatus::Pending
                    && r.approver_id.is_none()
                    && r.inspector_signature.starts_with("data:image/png;base64,")
            })
            .times(1)
            .returning(|_| {
                Ok(SubmissionReceipt {
                    record_id: Some("rec-1".to_string()),
                    backend: "mock".to_string(),
                })
            });
        let pipeline = SubmissionPipeline::new(Arc::new(backend), notifier_expecting(SUBMIT_SUCCESS_MESSAGE));
        let mut form = signed_form();
        let first_item = form.schema.sections[0].items[0].id.clone();
        form.state.inspection_type = InspectionType::LongHoliday;
        form.state.operation_status = OperationStatus::Inbound;
        form.state.patrol_points = vec!["北側".to_string()];
        form.state.set_item_status(&first_item, CheckStatus::Abnormal);
        form.state.set_item_time(&first_item, "23:59");
        form.state.set_item_remark(&first_item, "門未上鎖");

        let receipt = pipeline.submit(&session(), &mut form).await.unwrap();
        assert_eq!(receipt.record_id.as_deref(), Some("rec-1"));
        assert_eq!(pipeline.state(), PipelineState::Succeeded);
        assert!(form.signature.is_blank());
        assert!(!form.submit_control.disabled);

        // 草稿全部回到默认值
        assert!(form.state.silo_selection.is_empty());
        assert_eq!(form.state.inspection_type, InspectionType::General);
        assert_eq!(form.state.operation_status, OperationStatus::None);
        assert!(form.state.general_notes.is_empty());
        assert!(form.state.patrol_points.is_empty());
        assert!(!form.state.inspection_date.is_empty());
        let draft = form.collect();
        assert_eq!(draft.check_items.len(), form.schema.total_items());
        for item in &draft.check_items {
            assert_eq!(item.status, CheckStatus::Normal);
            assert!(item.remark.is_empty());
            assert_eq!(item.time.len(), 5);
        }
    }

    #[tokio::test]
    async fn missing_silo_is_rejected_before_backend() {
        let pipeline = SubmissionPipeline::new(backend_never_called(), notifier_expecting(MISSING_HEADER_MESSAGE));
        let mut form = signed_form();
        form.state.silo_selection.clear();

        let err = pipeline.submit(&session(), &mut form).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn blank_signature_is_rejected() {
        let pipeline = SubmissionPipeline::new(backend_never_called(), notifier_expecting(MISSING_SIGNATURE_MESSAGE));
        let mut form = signed_form();
        form.signature.clear();

        let err = pipeline.submit(&session(), &mut form).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn signed_out_session_is_refused() {
        let pipeline = SubmissionPipeline::new(backend_never_called(), notifier_expecting(SESSION_NOT_READY_MESSAGE));
        let session = session();
        session.sign_out();
        let err = pipeline.submit(&session, &mut signed_form()).await.unwrap_err();
        assert_eq!(err.error_code(), "AUTHENTICATION_ERROR");
    }

    #[tokio::test]
    async fn backend_failure_keeps_draft_for_retry() {
        let mut backend = MockISubmissionBackend::new();
        backend.expect_backend_name().return_const("mock");
        let mut calls = 0;
        backend.expect_submit_record().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(AppError::backend_rejected("quota exceeded"))
            } else {
                Ok(SubmissionReceipt { record_id: None, backend: "mock".to_string() })
            }
        });

        let mut notifier = MockIUserNotifier::new();
        let mut seq = mockall::Sequence::new();
        notifier
            .expect_alert()
            .with(eq("提交失敗: quota exceeded"))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        notifier
            .expect_alert()
            .with(eq(SUBMIT_SUCCESS_MESSAGE))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let pipeline = SubmissionPipeline::new(Arc::new(backend), Arc::new(notifier));
        let mut form = signed_form();
        let err = pipeline.submit(&session(), &mut form).await.unwrap_err();
        assert!(err.is_transport_error());
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(form.state.silo_selection, "一廠#3");
        assert!(!form.signature.is_blank());
        assert!(!form.submit_control.disabled);

        pipeline.submit(&session(), &mut form).await.unwrap();
        assert_eq!(pipeline.state(), PipelineState::Succeeded);
    }

    /// 等待放行才回应的后端
    struct GatedBackend {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ISubmissionBackend for GatedBackend {
        fn backend_name(&self) -> &'static str {
            "gated"
        }

        async fn submit_record(&self, _record: &NewInspectionRecord) -> AppResult<SubmissionReceipt> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(SubmissionReceipt { record_id: None, backend: "gated".to_string() })
        }
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_rejected() {
        let backend = Arc::new(GatedBackend { entered: Notify::new(), release: Notify::new() });
        let mut notifier = MockIUserNotifier::new();
        notifier.expect_alert().with(eq(SUBMIT_SUCCESS_MESSAGE)).times(1).return_const(());
        let pipeline = Arc::new(SubmissionPipeline::new(backend.clone(), Arc::new(notifier)));

        let first = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let mut form = signed_form();
                pipeline.submit(&session(), &mut form).await
            })
        };
        backend.entered.notified().await;
        assert_eq!(pipeline.state(), PipelineState::Submitting);

        let err = pipeline.submit(&session(), &mut signed_form()).await.unwrap_err();
        assert_eq!(err.error_code(), "CONCURRENCY_ERROR");

        backend.release.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Succeeded);
    }

    #[tokio::test]
    async fn dropped_submit_restores_control_and_allows_retry() {
        let backend = Arc::new(GatedBackend { entered: Notify::new(), release: Notify::new() });
        let mut notifier = MockIUserNotifier::new();
        notifier.expect_alert().with(eq(SUBMIT_SUCCESS_MESSAGE)).times(1).return_const(());
        let pipeline = SubmissionPipeline::new(backend.clone(), Arc::new(notifier));
        let mut form = signed_form();

        {
            let sess = session();
            let submit = pipeline.submit(&sess, &mut form);
            tokio::pin!(submit);
            tokio::select! {
                _ = &mut submit => panic!("后端未放行前不应完成"),
                _ = backend.entered.notified() => {}
            }
            assert_eq!(pipeline.state(), PipelineState::Submitting);
        }

        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(!form.submit_control.disabled);
        assert_eq!(form.submit_control.label, SUBMIT_LABEL_IDLE);
        assert_eq!(form.state.silo_selection, "一廠#3");

        // 放行许可留给下一次请求
        backend.release.notify_one();
        pipeline.submit(&session(), &mut form).await.unwrap();
        assert_eq!(pipeline.state(), PipelineState::Succeeded);
    }
}
