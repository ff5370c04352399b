use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    cars::{
        dto::{CarEnvelope, CarForm, MessageResponse, SearchQuery},
        repo_types::Car,
        services,
    },
    error::AppError,
    state::AppState,
};

const UPLOAD_LIMIT: usize = 20 * 1024 * 1024; // 20MB

pub fn car_routes() -> Router<AppState> {
    Router::new()
        .route("/service/car/add", post(add_car))
        .route("/service/car/update/:id", put(update_car))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .route("/service/car/list", get(list_cars))
        .route("/service/car/search", get(search_cars))
        .route("/service/car/delete/:id", delete(delete_car))
}

fn bad_multipart(e: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Invalid form data: {e}"))
}

/// Reads `company`, `model`, `description`, `tags` and any number of `images`
/// files; other fields are skipped.
async fn read_car_form(mut mp: Multipart) -> Result<CarForm, AppError> {
    let mut form = CarForm::default();
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "company" => form.company = Some(field.text().await.map_err(bad_multipart)?),
            "model" => form.model = Some(field.text().await.map_err(bad_multipart)?),
            "description" => form.description = Some(field.text().await.map_err(bad_multipart)?),
            "tags" => form.tags = Some(field.text().await.map_err(bad_multipart)?),
            "images" | "images[]" => form.images.push(field.bytes().await.map_err(bad_multipart)?),
            _ => {}
        }
    }
    Ok(form)
}

#[instrument(skip(state, user, mp), fields(caller = %user.0.username))]
pub async fn add_car(
    State(state): State<AppState>,
    user: AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<CarEnvelope>, AppError> {
    let owner = user.user_id()?;
    let form = read_car_form(mp?).await?;
    let car = services::add_car(state.cars.as_ref(), owner, form, &state.config.cars).await?;
    Ok(Json(CarEnvelope {
        message: "Car created with images".into(),
        car,
    }))
}

#[instrument(skip(state, user), fields(caller = %user.0.username))]
pub async fn list_cars(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Car>>, AppError> {
    let owner = user.user_id()?;
    Ok(Json(services::list_cars(state.cars.as_ref(), owner).await?))
}

/// Public unless `SEARCH_REQUIRES_AUTH` is set; results span every owner.
#[instrument(skip(state, user))]
pub async fn search_cars(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Car>>, AppError> {
    if state.config.cars.search_requires_auth && user.is_none() {
        return Err(AppError::Unauthorized("Unauthorized".into()));
    }
    Ok(Json(
        services::search_cars(state.cars.as_ref(), q.keyword.as_deref()).await?,
    ))
}

#[instrument(skip(state, user, mp), fields(caller = %user.0.username))]
pub async fn update_car(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<CarEnvelope>, AppError> {
    let id = services::parse_car_id(&id)?;
    let form = read_car_form(mp?).await?;
    let car = services::update_car(
        state.cars.as_ref(),
        user.0.user_id,
        id,
        form,
        &state.config.cars,
    )
    .await?;
    Ok(Json(CarEnvelope {
        message: "Car Updated Successfully".into(),
        car,
    }))
}

#[instrument(skip(state, user), fields(caller = %user.0.username))]
pub async fn delete_car(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = services::parse_car_id(&id)?;
    services::delete_car(state.cars.as_ref(), user.0.user_id, id, &state.config.cars).await?;
    Ok(Json(MessageResponse {
        message: "Car deleted successfully".into(),
    }))
}
