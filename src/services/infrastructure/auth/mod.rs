/// 登入服务

pub mod auth_service;

pub use auth_service::{AuthService, TokenClaims, ANONYMOUS_UID_LEN};
