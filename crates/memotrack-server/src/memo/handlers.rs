//! JSON handlers for the memo API. Every operation is counted in
//! `memotrack_memo_operations_total` by outcome.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::ApiResult;
use crate::memo::model::{Memo, MemoStats, NewMemo};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignReq {
    pub assignee: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptReq {
    pub user: String,
}

fn counted<T>(state: &AppState, operation: &str, res: memotrack_core::Result<T>) -> ApiResult<T> {
    state.metrics().record_memo_op(operation, res.is_ok());
    Ok(res?)
}

pub async fn create_memo(
    State(state): State<AppState>,
    Json(new): Json<NewMemo>,
) -> ApiResult<(StatusCode, Json<Memo>)> {
    let res = state.store().create_memo(new).await;
    let memo = counted(&state, "create", res)?;
    tracing::info!(memo_id = memo.id, author = %memo.author, "memo created");
    Ok((StatusCode::CREATED, Json(memo)))
}

pub async fn get_memo(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Memo>> {
    let res = state.store().get_memo(id).await;
    Ok(Json(counted(&state, "get", res)?))
}

pub async fn assign_memo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AssignReq>,
) -> ApiResult<Json<Memo>> {
    let res = state.store().assign_memo(id, &req.assignee).await;
    Ok(Json(counted(&state, "assign", res)?))
}

pub async fn accept_memo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AcceptReq>,
) -> ApiResult<Json<Memo>> {
    let res = state.store().accept_memo(id, &req.user).await;
    let memo = counted(&state, "accept", res)?;
    tracing::info!(memo_id = memo.id, user = %req.user, "memo accepted");
    Ok(Json(memo))
}

pub async fn archive_memo(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Memo>> {
    let res = state.store().archive_memo(id).await;
    Ok(Json(counted(&state, "archive", res)?))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<MemoStats>> {
    let res = state.store().stats().await;
    Ok(Json(counted(&state, "stats", res)?))
}
