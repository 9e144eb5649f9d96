/// 登入服务
///
/// 宿主环境可以注入一个自订令牌（HS256 JWT，`sub` 为使用者ID）。
/// 令牌缺失、未配置密钥或校验失败时，一律退回匿名登入。

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::enums::AuthMethod;
use crate::services::domain::session::SessionContext;
use crate::utils::config::AuthConfig;
use crate::utils::error::{AppError, AppResult};

/// 匿名使用者ID长度
pub const ANONYMOUS_UID_LEN: usize = 28;

/// 自订令牌的声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: usize,
}

pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// 登入；显式传入的令牌优先于配置中的初始令牌
    pub fn sign_in(&self, initial_token: Option<&str>) -> SessionContext {
        let token = initial_token
            .or(self.config.initial_token.as_deref())
            .filter(|t| !t.trim().is_empty());

        if let Some(token) = token {
            match self.verify_token(token) {
                Ok(user_id) => {
                    info!("[AuthService] 自订令牌登入成功: {}", crate::services::domain::session::short_id(&user_id));
                    return SessionContext::new(user_id, AuthMethod::CustomToken);
                }
                Err(e) => {
                    warn!("[AuthService] 自订令牌登入失败，改用匿名登入: {}", e);
                }
            }
        }

        self.sign_in_anonymously()
    }

    /// 匿名登入，产生随机 28 位英数ID
    pub fn sign_in_anonymously(&self) -> SessionContext {
        let uid: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ANONYMOUS_UID_LEN)
            .map(char::from)
            .collect();
        info!("[AuthService] 匿名登入: {}", crate::services::domain::session::short_id(&uid));
        SessionContext::new(uid, AuthMethod::Anonymous)
    }

    /// 校验令牌并取出使用者ID
    pub fn verify_token(&self, token: &str) -> AppResult<String> {
        let secret = self
            .config
            .token_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::authentication_error("未配置令牌密钥，无法校验自订令牌"))?;

        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| AppError::authentication_error(format!("令牌校验失败: {}", e)))?;

        if data.claims.sub.trim().is_empty() {
            return Err(AppError::authentication_error("令牌缺少使用者ID"));
        }
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "grain-test-secret";

    fn token_for(sub: &str, secret: &str, exp_offset: i64) -> String {
        let claims = TokenClaims {
            sub: sub.to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn service_with_secret() -> AuthService {
        AuthService::new(AuthConfig {
            initial_token: None,
            token_secret: Some(SECRET.to_string()),
        })
    }

    #[test]
    fn valid_token_signs_in_as_subject() {
        let service = service_with_secret();
        let token = token_for("inspector-42", SECRET, 3600);
        let session = service.sign_in(Some(&token));
        assert_eq!(session.user_id(), "inspector-42");
        assert_eq!(session.auth_method(), AuthMethod::CustomToken);
        assert!(session.is_ready());
    }

    #[test]
    fn bad_or_expired_token_falls_back_to_anonymous() {
        let service = service_with_secret();

        let forged = token_for("intruder", "other-secret", 3600);
        let session = service.sign_in(Some(&forged));
        assert!(session.is_anonymous());
        assert_eq!(session.user_id().len(), ANONYMOUS_UID_LEN);
        assert!(session.user_id().chars().all(|c| c.is_ascii_alphanumeric()));

        let expired = token_for("inspector-42", SECRET, -3600);
        assert!(service.sign_in(Some(&expired)).is_anonymous());
        assert!(service.sign_in(Some("not-a-jwt")).is_anonymous());
    }

    #[test]
    fn token_without_secret_is_anonymous() {
        let service = AuthService::new(AuthConfig {
            initial_token: Some(token_for("inspector-42", SECRET, 3600)),
            token_secret: None,
        });
        let session = service.sign_in(None);
        assert!(session.is_anonymous());
    }

    #[test]
    fn configured_initial_token_is_used() {
        let service = AuthService::new(AuthConfig {
            initial_token: Some(token_for("host-user", SECRET, 3600)),
            token_secret: Some(SECRET.to_string()),
        });
        assert_eq!(service.sign_in(None).user_id(), "host-user");
    }

    #[test]
    fn anonymous_ids_differ() {
        let service = AuthService::new(AuthConfig::default());
        let a = service.sign_in(None);
        let b = service.sign_in(None);
        assert_ne!(a.user_id(), b.user_id());
    }
}
