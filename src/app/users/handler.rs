//! 用户处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Map, Value};

use super::{
    model::{
        CreateUserRequest, CreateUserResponse, DeleteUserResponse, ListUsersResponse,
        UpdateUserResponse,
    },
    service::UserService,
};
use crate::core::{error::CoreError, extract::JsonBody};

#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
}

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ListUsersResponse>, CoreError> {
    let all_users = state.user_service.list_users().await?;
    Ok(Json(ListUsersResponse {
        message: "All users successfully fetched!",
        all_users,
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), CoreError> {
    let new_user = state.user_service.create_user(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            message: "User added successfully!",
            new_user,
        }),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> Result<Json<UpdateUserResponse>, CoreError> {
    let updated_user = state.user_service.update_user(&id, body).await?;
    Ok(Json(UpdateUserResponse {
        message: "User updated successfully!",
        updated_user,
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteUserResponse>, CoreError> {
    let deleted_user = state.user_service.delete_user(&id).await?;
    Ok(Json(DeleteUserResponse {
        message: "User deleted successfully!",
        deleted_user,
    }))
}
