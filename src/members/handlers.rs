use axum::{
    extract::{Path, RawForm, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use tracing::{instrument, warn};

use super::{
    form::{render_form, FieldErrors, FormPage, FormValues},
    repo_types::Member,
    services::save_member,
};
use crate::{error::AppError, state::AppState};

pub fn form_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(new_form).post(submit_new))
        .route("/:member_id", get(edit_form).post(submit_edit))
}

async fn load_member(state: &AppState, member_id: i64) -> Result<Member, AppError> {
    state
        .members
        .get_member(member_id)
        .await?
        .ok_or(AppError::MemberNotFound(member_id))
}

async fn render_page(
    state: &AppState,
    member_id: Option<i64>,
    values: &FormValues,
    errors: &FieldErrors,
) -> Result<String, AppError> {
    let languages = state.members.list_languages().await?;
    let topics = state.members.list_topics().await?;
    Ok(render_form(&FormPage {
        member_id,
        languages: &languages,
        topics: &topics,
        values,
        errors,
    }))
}

#[instrument(skip(state))]
pub async fn new_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let page = render_page(&state, None, &FormValues::default(), &FieldErrors::new()).await?;
    Ok(Html(page))
}

#[instrument(skip(state))]
pub async fn edit_form(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let member = load_member(&state, member_id).await?;
    let topics = state.members.member_topics(member.id).await?;
    let values = FormValues::from_member(&member, &topics)?;
    let page = render_page(&state, Some(member_id), &values, &FieldErrors::new()).await?;
    Ok(Html(page))
}

#[instrument(skip(state, body))]
pub async fn submit_new(
    State(state): State<AppState>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    submit(&state, None, &body).await
}

#[instrument(skip(state, body))]
pub async fn submit_edit(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let member = load_member(&state, member_id).await?;
    submit(&state, Some(member), &body).await
}

async fn submit(state: &AppState, existing: Option<Member>, body: &[u8]) -> Result<Response, AppError> {
    let values = FormValues::from_urlencoded(body);
    let errors = values.validate(existing.is_some());

    if !errors.is_empty() {
        let member_id = existing.as_ref().map(|m| m.id);
        warn!(?member_id, fields = ?errors.keys().collect::<Vec<_>>(), "member form rejected");
        let page = render_page(state, member_id, &values, &errors).await?;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
    }

    let input = values.into_input()?;
    let member = save_member(state.members.as_ref(), existing, input).await?;
    Ok(Redirect::to(&format!("/{}", member.id)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &[u8] = b"email=a%40b.com&password=secret&location=NY&first_learn_date=2023-01-01\
&fav_language=1&about=hi&learn_new_interest=yes&interest_in_topics=1&interest_in_topics=2";

    #[tokio::test]
    async fn submit_creates_and_redirects_to_member() {
        let state = AppState::fake();
        let res = submit(&state, None, VALID).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()["location"], "/1");
        assert!(state.members.get_member(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_edit_leaves_member_untouched() {
        let state = AppState::fake();
        submit(&state, None, VALID).await.unwrap();
        let before = load_member(&state, 1).await.unwrap();

        let res = submit(&state, Some(before.clone()), b"email=&location=LA&fav_language=1")
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let after = load_member(&state, 1).await.unwrap();
        assert_eq!(after.location, before.location);
        assert_eq!(after.email, before.email);
    }

    #[tokio::test]
    async fn missing_member_is_not_found() {
        let state = AppState::fake();
        let err = load_member(&state, 77).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
