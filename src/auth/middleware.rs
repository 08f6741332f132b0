//! JWT 认证中间件

use crate::{auth::jwt::JwtService, error::AppError, models::user::Role};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated caller, built from a validated access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

// 在 handler 中直接提取 Principal
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}

/// Resolve a bearer access token into a `Principal`
pub fn authenticate(jwt_service: &JwtService, headers: &HeaderMap) -> Result<Principal, AppError> {
    let token = extract_token(headers)?;

    let claims = jwt_service.validate_access_token(&token).map_err(|e| {
        tracing::debug!(reason = %e, "Access token rejected");
        AppError::Unauthorized
    })?;

    let account_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(Principal {
        account_id,
        email: claims.email,
        role: claims.role,
    })
}

/// 必须认证：校验 access token 并把 Principal 附加到请求扩展
pub async fn require_auth(
    State(jwt_service): State<Arc<JwtService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = authenticate(&jwt_service, req.headers())?;
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// 必须是管理员。挂在 `require_auth` 之内。
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .ok_or(AppError::Unauthorized)?;

    if let Err(e) = principal.require_admin() {
        tracing::warn!(account_id = %principal.account_id, "Admin route denied");
        return Err(e);
    }

    Ok(next.run(req).await)
}
