/// 登入会话
///
/// 登入成功时创建，登出时销毁；绑定在会话上的背景任务（如即时列表）
/// 通过取消令牌随会话一同结束。

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::models::enums::AuthMethod;
use crate::utils::error::{AppError, AppResult};

/// 会话未就绪时的提示
pub const SESSION_NOT_READY_MESSAGE: &str = "應用程式尚未準備就緒或未登入，請稍候再試。";

/// 审核时会话未就绪的提示
pub const SESSION_NOT_READY_FOR_APPROVAL: &str = "應用程式尚未準備就緒或未登入。";

#[derive(Debug, Clone)]
pub struct SessionContext {
    user_id: String,
    auth_method: AuthMethod,
    signed_in_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, auth_method: AuthMethod) -> Self {
        Self {
            user_id: user_id.into(),
            auth_method,
            signed_in_at: Utc::now(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    pub fn signed_in_at(&self) -> DateTime<Utc> {
        self.signed_in_at
    }

    pub fn is_anonymous(&self) -> bool {
        self.auth_method == AuthMethod::Anonymous
    }

    /// 已登入且尚未登出
    pub fn is_ready(&self) -> bool {
        !self.user_id.is_empty() && !self.cancel.is_cancelled()
    }

    /// 未就绪时返回认证错误
    pub fn ensure_ready(&self, message: &str) -> AppResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(AppError::authentication_error(message))
        }
    }

    /// 使用者ID前 8 个字符
    pub fn short_id(&self) -> String {
        short_id(&self.user_id)
    }

    /// 巡察人显示名称 `User-xxxxxxxx`
    pub fn inspector_name(&self) -> String {
        format!("User-{}", self.short_id())
    }

    /// 审核人显示名称 `Manager-xxxxxxxx`
    pub fn approver_name(&self) -> String {
        format!("Manager-{}", self.short_id())
    }

    /// 会话的取消令牌（子令牌随会话一起取消）
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// 登出：取消所有绑定在会话上的任务
    pub fn sign_out(&self) {
        log::info!("[Session] 使用者 {} 登出", self.short_id());
        self.cancel.cancel();
    }
}

/// 取字符串前 8 个字符
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_use_first_eight_chars() {
        let session = SessionContext::new("abcdefghijklmnop", AuthMethod::CustomToken);
        assert_eq!(session.inspector_name(), "User-abcdefgh");
        assert_eq!(session.approver_name(), "Manager-abcdefgh");

        let short = SessionContext::new("abc", AuthMethod::Anonymous);
        assert_eq!(short.inspector_name(), "User-abc");
        assert!(short.is_anonymous());
    }

    #[test]
    fn sign_out_cancels_children_and_session() {
        let session = SessionContext::new("user-1", AuthMethod::Anonymous);
        let child = session.cancellation_token();
        assert!(session.is_ready());
        session.sign_out();
        assert!(child.is_cancelled());
        assert!(!session.is_ready());
        assert!(session.ensure_ready(SESSION_NOT_READY_MESSAGE).is_err());
    }
}
