use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Json, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;

use crate::{
    config::RankOrder,
    error::{ErrorKind, LedgerError, LedgerResult},
    ledger::Ledger,
    post::{LikeState, NewPost, Post, PostId},
    store::Store,
    user::{NewUser, User, UserId},
};

/// Header carrying the signed-in user, filled in by the session layer in front of us.
pub const SESSION_HEADER: &str = "x-user-id";

pub struct AppState<S> {
    ledger: Arc<Ledger<S>>,
    order: RankOrder,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            order: self.order,
        }
    }
}

pub fn router<S: Store>(ledger: Arc<Ledger<S>>, order: RankOrder) -> Router {
    Router::new()
        .route("/posts", get(list_posts::<S>).post(create_post::<S>))
        .route("/post/:id", get(get_post::<S>))
        .route("/like/:id", post(toggle_like::<S>))
        .route("/delete/:id", post(delete_post::<S>))
        .route("/profile", get(profile::<S>))
        .route("/register", post(register::<S>))
        .route("/login", post(login::<S>))
        .route("/users/:name", get(get_user::<S>))
        .with_state(AppState { ledger, order })
}

//===================================================
// Errors
//===================================================

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("ledger task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Ledger(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Invalid => StatusCode::BAD_REQUEST,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("Rejected request: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

//===================================================
// Session
//===================================================

/// The authenticated user of the current request.
pub struct Session(pub UserId);

#[async_trait]
impl<St: Send + Sync> FromRequestParts<St> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .map(|id| Session(UserId(id)))
            .ok_or(AppError::Unauthenticated)
    }
}

//===================================================
// Payloads
//===================================================

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub order: Option<RankOrder>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub username: String,
    pub google_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    pub google_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub posts: Vec<Post>,
}

//===================================================
// Handlers
//===================================================

/// Run a ledger call on the blocking pool; stores take sync locks and do file I/O.
async fn with_ledger<S, T, F>(state: &AppState<S>, f: F) -> Result<T, AppError>
where
    S: Store,
    T: Send + 'static,
    F: FnOnce(&Ledger<S>) -> LedgerResult<T> + Send + 'static,
{
    let ledger = state.ledger.clone();
    Ok(tokio::task::spawn_blocking(move || f(&ledger)).await??)
}

async fn list_posts<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    let order = query.order.unwrap_or(state.order);
    let posts = with_ledger(&state, move |ledger| ledger.rank_posts(order)).await?;
    Ok(Json(posts))
}

async fn create_post<S: Store>(
    State(state): State<AppState<S>>,
    Session(user): Session,
    Json(payload): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = with_ledger(&state, move |ledger| {
        ledger.create_post(NewPost::new(user, payload.title, payload.content))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<PostId>,
) -> Result<Json<Post>, AppError> {
    let post = with_ledger(&state, move |ledger| ledger.find_post(id)).await?;
    Ok(Json(post))
}

async fn toggle_like<S: Store>(
    State(state): State<AppState<S>>,
    Session(user): Session,
    Path(id): Path<PostId>,
) -> Result<Json<LikeState>, AppError> {
    let like = with_ledger(&state, move |ledger| ledger.toggle_like(id, user)).await?;
    Ok(Json(like))
}

async fn delete_post<S: Store>(
    State(state): State<AppState<S>>,
    Session(user): Session,
    Path(id): Path<PostId>,
) -> Result<Json<MessageResponse>, AppError> {
    with_ledger(&state, move |ledger| ledger.delete_post(id, user)).await?;
    Ok(Json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}

async fn profile<S: Store>(
    State(state): State<AppState<S>>,
    Session(user): Session,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let order = query.order.unwrap_or(state.order);
    let profile = with_ledger(&state, move |ledger| {
        let posts = ledger.profile_posts(user, order)?;
        let user = ledger.user(user)?;
        Ok(ProfileResponse { user, posts })
    })
    .await?;
    Ok(Json(profile))
}

async fn register<S: Store>(
    State(state): State<AppState<S>>,
    Json(payload): Json<RegisterUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = with_ledger(&state, move |ledger| {
        ledger.register_user(NewUser::new(payload.username, &payload.google_id))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange a verified external identity for the local account.
async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Json(payload): Json<Login>,
) -> Result<Json<User>, AppError> {
    let user = with_ledger(&state, move |ledger| ledger.login(&payload.google_id)).await?;
    Ok(Json(user))
}

async fn get_user<S: Store>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = with_ledger(&state, move |ledger| ledger.user_by_name(&name)).await?;
    Ok(Json(user))
}
