use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use super::{
    dto::{MemberBody, MemberEnvelope, MemberJson, MembersEnvelope, RefJson},
    repo::MemberRepo,
    repo_types::Member,
    services::{member_to_json, save_member},
};
use crate::{error::AppError, state::AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/member", get(list_members).post(create_member))
        .route(
            "/api/member/:id",
            get(get_member)
                .put(edit_member)
                .patch(edit_member)
                .delete(delete_member),
        )
        .route("/api/language", get(list_languages))
        .route("/api/topic", get(list_topics))
        .route("/api/topic/:id/members", get(topic_members))
}

async fn serialize_all(repo: &dyn MemberRepo, members: &[Member]) -> Result<Vec<MemberJson>, AppError> {
    let mut out = Vec::with_capacity(members.len());
    for m in members {
        out.push(member_to_json(repo, m).await?);
    }
    Ok(out)
}

#[instrument(skip(state))]
pub async fn list_members(State(state): State<AppState>) -> Result<Json<MembersEnvelope>, AppError> {
    let repo = state.members.as_ref();
    let members = repo.list_members().await?;
    Ok(Json(MembersEnvelope {
        members: serialize_all(repo, &members).await?,
    }))
}

#[instrument(skip(state))]
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MemberEnvelope>, AppError> {
    let repo = state.members.as_ref();
    let member = repo.get_member(id).await?.ok_or(AppError::MemberNotFound(id))?;
    Ok(Json(MemberEnvelope {
        member: member_to_json(repo, &member).await?,
    }))
}

#[instrument(skip(state, body))]
pub async fn create_member(
    State(state): State<AppState>,
    Json(body): Json<MemberBody>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.members.as_ref();
    let member = save_member(repo, None, body.into_input()?).await?;
    let location = format!("/api/member/{}", member.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(MemberEnvelope {
            member: member_to_json(repo, &member).await?,
        }),
    ))
}

/// PUT/PATCH share one handler: the full field set is expected either way,
/// the password alone may be left out.
#[instrument(skip(state, body))]
pub async fn edit_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<MemberBody>,
) -> Result<Json<MemberEnvelope>, AppError> {
    let repo = state.members.as_ref();
    let existing = repo.get_member(id).await?.ok_or(AppError::MemberNotFound(id))?;
    let member = save_member(repo, Some(existing), body.into_input()?).await?;
    Ok(Json(MemberEnvelope {
        member: member_to_json(repo, &member).await?,
    }))
}

#[instrument(skip(state))]
pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.members.delete_member(id).await? {
        return Err(AppError::MemberNotFound(id));
    }
    info!(member_id = id, "member deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_languages(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let languages: Vec<RefJson> = state
        .members
        .list_languages()
        .await?
        .into_iter()
        .map(RefJson::from)
        .collect();
    Ok(Json(json!({ "languages": languages })))
}

#[instrument(skip(state))]
pub async fn list_topics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let topics: Vec<RefJson> = state
        .members
        .list_topics()
        .await?
        .into_iter()
        .map(RefJson::from)
        .collect();
    Ok(Json(json!({ "topics": topics })))
}

#[instrument(skip(state))]
pub async fn topic_members(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MembersEnvelope>, AppError> {
    let repo = state.members.as_ref();
    repo.get_topic(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("topic {id} not found")))?;
    let members = repo.topic_members(id).await?;
    Ok(Json(MembersEnvelope {
        members: serialize_all(repo, &members).await?,
    }))
}
