use actix_web::{web, HttpResponse};
use billhub_models::{CreateUserRequest, UpdateUserRequest};
use serde_json::json;

use super::{AppState, UserId};
use crate::errors::ServiceError;

pub fn configure_user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::post().to(create_user))
            .route("", web::get().to(list_users))
            .route("/{user_id}", web::get().to(get_user))
            .route("/{user_id}", web::put().to(update_user))
            .route("/{user_id}", web::delete().to(delete_user)),
    );
}

/// Registration is the one route that needs no caller identity.
pub async fn create_user(
    state: web::Data<AppState>,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = state.users.create_user(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "user_id": user.id,
        "message": "User created successfully"
    })))
}

pub async fn list_users(state: web::Data<AppState>, _user: UserId) -> Result<HttpResponse, ServiceError> {
    let users = state.users.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn get_user(
    state: web::Data<AppState>,
    _user: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user = state.users.get_user(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn update_user(
    state: web::Data<AppState>,
    caller: UserId,
    path: web::Path<String>,
    request: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = path.into_inner();
    state
        .users
        .update_user(caller.as_str(), &user_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User updated successfully" })))
}

pub async fn delete_user(
    state: web::Data<AppState>,
    caller: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = path.into_inner();
    state.users.delete_user(caller.as_str(), &user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}
