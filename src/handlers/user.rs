//! 账户查询的 HTTP 处理器

use crate::{auth::Principal, error::AppError, middleware::AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 当前账户
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.get_account(principal.account_id).await?;

    Ok(Json(user))
}

/// 按 ID 获取账户（管理员）
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    principal.require_admin()?;

    let user = state.auth_service.get_account(id).await?;

    Ok(Json(user))
}
