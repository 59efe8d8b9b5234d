use crate::{
    server::{
        AccountRouteError, Result, ServerRouter,
        extract::{AccountJson, Json},
    },
    service::{AccountService, Login},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use miniblog_common::model::{
    Id,
    user::{LoginRequest, User, UserMarker},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(login)
        .typed_get(get_profile)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/auth/login", rejection(AccountRouteError))]
struct LoginPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/auth/profile/{id}", rejection(AccountRouteError))]
struct ProfilePath {
    id: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct LoginResponse {
    message: &'static str,
    user: User,
}

async fn login(
    LoginPath(): LoginPath,
    State(accounts): State<Arc<AccountService>>,
    AccountJson(request): AccountJson<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AccountRouteError> {
    let login = accounts.login(request).await?;
    let (status, message) = match login {
        Login::Existing(_) => (StatusCode::OK, "Login successful"),
        Login::Registered(_) => (
            StatusCode::CREATED,
            "Account created and logged in successfully",
        ),
    };

    Ok((
        status,
        Json(LoginResponse {
            message,
            user: login.into_user(),
        }),
    ))
}

async fn get_profile(
    ProfilePath { id }: ProfilePath,
    State(accounts): State<Arc<AccountService>>,
) -> Result<Json<User>, AccountRouteError> {
    let user = accounts.profile(id).await?;

    Ok(Json(user))
}
