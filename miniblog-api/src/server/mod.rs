use crate::service::{AccountError, AccountService, PostError, PostService};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use extract::Json;
use miniblog_common::model::auth::AuthorizationCheck;
use miniblog_db::{PostRepository, UserRepository};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error};

mod extract;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub posts: Arc<PostService>,
    pub accounts: Arc<AccountService>,
}

impl ServerState {
    #[must_use]
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        authorization: Arc<dyn AuthorizationCheck>,
    ) -> Self {
        Self {
            posts: Arc::new(PostService::new(posts, authorization)),
            accounts: Arc::new(AccountService::new(users)),
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

/// The full application: API routes, liveness routes and middleware.
pub fn app(state: ServerState) -> Router {
    routes()
        .route("/", get(|| async { "Mini Blog API is running" }))
        .route("/keep-alive", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Post(#[from] PostError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => StatusCode::NOT_FOUND,
            ServerError::QueryRejection(_) | ServerError::JsonRejection(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::JsonResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Post(err) => err.status(),
            ServerError::Account(err) => err.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => "Not found".to_owned(),
            ServerError::QueryRejection(rejection) => rejection.body_text(),
            ServerError::JsonRejection(rejection) => rejection.body_text(),
            ServerError::JsonResponse(_) => "Server Error".to_owned(),
            ServerError::Post(err) => err.message(),
            ServerError::Account(err) => err.message(),
        }
    }

    fn reply(self, key: MessageKey) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let text = self.message();
        let (msg, message) = match key {
            MessageKey::Msg => (Some(text), None),
            MessageKey::Message => (None, Some(text)),
        };

        let error_response = ErrorResponse {
            status: status.as_u16(),
            msg,
            message,
        };
        (status, Json(error_response)).into_response()
    }
}

/// Which key carries the human readable text of an error body.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
enum MessageKey {
    /// Post routes and generic rejections.
    Msg,
    /// Account routes.
    Message,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let key = match self {
            ServerError::Account(_) => MessageKey::Message,
            _ => MessageKey::Msg,
        };
        self.reply(key)
    }
}

/// A [`ServerError`] raised on an account route, including rejected paths and bodies.
/// Always replies with the `message` key.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct AccountRouteError(ServerError);

impl From<AccountError> for AccountRouteError {
    fn from(value: AccountError) -> Self {
        Self(value.into())
    }
}

impl From<PathRejection> for AccountRouteError {
    fn from(value: PathRejection) -> Self {
        Self(value.into())
    }
}

impl From<JsonRejection> for AccountRouteError {
    fn from(value: JsonRejection) -> Self {
        Self(value.into())
    }
}

impl IntoResponse for AccountRouteError {
    fn into_response(self) -> Response {
        self.0.reply(MessageKey::Message)
    }
}
