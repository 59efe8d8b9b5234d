use crate::server::ServerRouter;

mod auth;
mod posts;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(posts::routes())
        .merge(auth::routes())
}
