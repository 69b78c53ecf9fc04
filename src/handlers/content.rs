use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::parse_id;
use crate::{
    AppState,
    accounts::{parse_datetime, require_text},
    error::{ApiError, ApiJson},
    models::{
        AboutContent, AboutImage, CategoriesPayload, CategoriesResponse, CategoryInput,
        CreateEventRequest, Event, EventQuery, EventUpdate, MessageResponse, NewEvent,
        UpdateEventRequest,
    },
};

// --- Events ---

/// list_events
///
/// [Public Route] Events ordered by date, latest first. `?popular=true`
/// restricts the list to featured events.
#[utoipa::path(
    get,
    path = "/api/events",
    params(EventQuery),
    responses(
        (status = 200, description = "Events", body = [Event]),
        (status = 404, description = "No events found", body = MessageResponse)
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state
        .repo
        .list_events(query.popular.unwrap_or(false))
        .await?;
    if events.is_empty() {
        return Err(ApiError::not_found("No events found"));
    }
    Ok(Json(events))
}

fn event_date(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, ApiError> {
    parse_datetime(raw).ok_or_else(|| ApiError::validation("date must be YYYY-MM-DD or RFC 3339"))
}

/// create_event
///
/// [Admin Route] Every field except `isPopular` is required.
#[utoipa::path(
    post,
    path = "/api/admin/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Missing or invalid field", body = MessageResponse)
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = NewEvent {
        title: require_text("title", &payload.title)?,
        location: require_text("location", &payload.location)?,
        date: event_date(&require_text("date", &payload.date)?)?,
        image_url: require_text("imageUrl", &payload.image_url)?,
        description: require_text("description", &payload.description)?,
        is_popular: payload.is_popular,
    };

    let created = state.repo.create_event(event).await?;
    tracing::info!(event_id = %created.id, "event created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/admin/events/{id}",
    params(("id" = String, Path, description = "Event id")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 404, description = "Unknown event", body = MessageResponse)
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    let id = parse_id(&raw_id)?;
    let text = |field: &str, value: Option<String>| -> Result<Option<String>, ApiError> {
        value.map(|v| require_text(field, &v)).transpose()
    };

    let update = EventUpdate {
        title: text("title", payload.title)?,
        location: text("location", payload.location)?,
        date: payload.date.as_deref().map(event_date).transpose()?,
        image_url: text("imageUrl", payload.image_url)?,
        description: text("description", payload.description)?,
        is_popular: payload.is_popular,
    };

    let event = state
        .repo
        .update_event(id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;
    Ok(Json(event))
}

#[utoipa::path(
    delete,
    path = "/api/admin/events/{id}",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Unknown event", body = MessageResponse)
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    if !state.repo.delete_event(id).await? {
        return Err(ApiError::not_found("Event not found"));
    }
    tracing::info!(event_id = %id, "event deleted");
    Ok(Json(MessageResponse::new("Event deleted successfully")))
}

// --- FAQ Categories ---

/// list_categories
///
/// [Public Route] The FAQ list in display order. Empty until an admin saves one.
#[utoipa::path(
    get,
    path = "/api/about/categories",
    responses((status = 200, description = "FAQ entries", body = CategoriesResponse))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = state.repo.list_categories().await?;
    Ok(Json(CategoriesResponse {
        message: None,
        categories,
    }))
}

/// replace_categories
///
/// [Admin Route] Replaces the whole FAQ list. One blank entry rejects the lot.
#[utoipa::path(
    put,
    path = "/api/admin/about/categories",
    request_body = CategoriesPayload,
    responses(
        (status = 200, description = "Saved list", body = CategoriesResponse),
        (status = 400, description = "Blank question or answer", body = MessageResponse)
    )
)]
pub async fn replace_categories(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CategoriesPayload>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let inputs = payload
        .categories
        .into_iter()
        .map(|c| {
            Ok(CategoryInput {
                question: require_text("question", &c.question)?,
                answer: require_text("answer", &c.answer)?,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let categories = state.repo.replace_categories(inputs).await?;
    tracing::info!(count = categories.len(), "faq categories replaced");
    Ok(Json(CategoriesResponse {
        message: Some("Categories saved successfully".to_string()),
        categories,
    }))
}

// --- About Content ---

/// get_about
///
/// [Public Route] The single About document, or 404 before the first save.
#[utoipa::path(
    get,
    path = "/api/about",
    responses(
        (status = 200, description = "About document", body = AboutContent),
        (status = 404, description = "Nothing published yet", body = MessageResponse)
    )
)]
pub async fn get_about(State(state): State<AppState>) -> Result<Json<AboutContent>, ApiError> {
    state
        .repo
        .get_about()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No about data found"))
}

/// update_about
///
/// [Admin Route] Replaces the about document, creating it on first save.
#[utoipa::path(
    put,
    path = "/api/admin/about",
    request_body = AboutContent,
    responses(
        (status = 200, description = "Saved", body = MessageResponse),
        (status = 400, description = "Blank title or description", body = MessageResponse)
    )
)]
pub async fn update_about(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AboutContent>,
) -> Result<Json<MessageResponse>, ApiError> {
    let about = AboutContent {
        title: require_text("title", &payload.title)?,
        description: require_text("description", &payload.description)?,
        images: payload
            .images
            .into_iter()
            .map(|image| {
                Ok(AboutImage {
                    url: require_text("images.url", &image.url)?,
                    alt: image.alt.trim().to_string(),
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?,
    };

    state.repo.upsert_about(about).await?;
    Ok(Json(MessageResponse::new("About data updated successfully")))
}
