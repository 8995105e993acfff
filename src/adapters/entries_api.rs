use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            audit::AuditEntry,
            error::AuditError,
            event::{LogEvent, SinkOutcome},
            fields::Fields,
            id::SubjectId,
            level::LogLevel,
            page::{PageRequest, PagedResult},
        },
        scope,
    },
    axum::{
        Json,
        extract::{Path, Query, Request, State},
        http::StatusCode,
        middleware::Next,
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// `GET /api/subjects/{id}/entries`, newest first.
pub async fn list_entries_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<AuditEntry>>, ApiError> {
    let subject_id = SubjectId::new(subject_id);
    let page = PageRequest::new(query.page, query.page_size);
    let result = state.store.get_by_subject(subject_id, page).await?;
    Ok(Json(result))
}

/// `GET /api/entries`: every subject's entries, newest first.
pub async fn list_all_entries_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<AuditEntry>>, ApiError> {
    let page = PageRequest::new(query.page, query.page_size);
    Ok(Json(state.store.get_all(page).await?))
}

#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub fields: Fields,
}

/// `POST /api/subjects/{id}/events`: records an administrative note about the
/// subject through the audit sink, attributed via the ambient scope.
pub async fn record_event_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
    Json(request): Json<RecordEventRequest>,
) -> Result<Response, ApiError> {
    let subject_id = SubjectId::new(subject_id);
    let _subject = scope::push(subject_id);

    let event = LogEvent::new(request.level, request.message).with_fields(request.fields);
    match state.sink.log(event).await? {
        SinkOutcome::Persisted(entry) => Ok((StatusCode::CREATED, Json(entry)).into_response()),
        SinkOutcome::Forwarded => Ok(StatusCode::ACCEPTED.into_response()),
        SinkOutcome::Dropped => Err(AuditError::Validation("message must not be blank".into()).into()),
    }
}

/// Runs each request as its own scope chain so subject bindings never leak
/// between concurrent requests.
pub async fn scope_chain_middleware(request: Request, next: Next) -> Response {
    scope::chain(next.run(request)).await
}
