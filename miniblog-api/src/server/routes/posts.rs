use crate::{
    server::{
        Result, ServerError, ServerRouter,
        extract::{Json, Query},
    },
    service::PostService,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use miniblog_common::model::{
    Id,
    post::{Post, PostDraft, PostEdit, PostListParams, PostMarker, PostPage, PostRemoval},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct Removed {
    msg: &'static str,
}

async fn list_posts(
    PostsPath(): PostsPath,
    State(posts): State<Arc<PostService>>,
    Query(params): Query<PostListParams>,
) -> Result<Json<PostPage>> {
    let page = posts.list(&params).await?;

    Ok(Json(page))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(posts): State<Arc<PostService>>,
) -> Result<Json<Post>> {
    let post = posts.get(id).await?;

    Ok(Json(post))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(posts): State<Arc<PostService>>,
    Json(draft): Json<PostDraft>,
) -> Result<Json<Post>> {
    let post = posts.create(draft).await?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(posts): State<Arc<PostService>>,
    Json(edit): Json<PostEdit>,
) -> Result<Json<Post>> {
    let post = posts.update(id, edit).await?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(posts): State<Arc<PostService>>,
    Json(removal): Json<PostRemoval>,
) -> Result<Json<Removed>> {
    posts.delete(id, removal).await?;

    Ok(Json(Removed { msg: "Post removed" }))
}
