use std::sync::Arc;

use crate::{
    auth::api::v1::AuthState,
    todo::{
        self,
        api::v1::{
            ListTasksResponse, MessageResponse, Pagination, TaskResponse, TodoState,
            TokenResponse,
        },
    },
};

use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::{
    Modify, OpenApi, ToSchema,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Body returned for every failed API request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        todo::api::v1::create_task_handler,
        todo::api::v1::list_tasks_handler,
        todo::api::v1::get_task_handler,
        todo::api::v1::update_task_handler,
        todo::api::v1::delete_task_handler,
        todo::api::v1::get_token_handler,
    ),
    components(schemas(
        todo::Todo,
        todo::CreateTodoRequest,
        todo::UpdateTodoRequest,
        crate::entities::todo::TodoStatus,
        TaskResponse,
        MessageResponse,
        ListTasksResponse,
        Pagination,
        TokenResponse,
        ErrorResponse,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = "Tasks", description = "Task management"),
        (name = "Auth", description = "Bearer token issuance")
    )
)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(auth_state: Arc<AuthState>, todo_state: Arc<TodoState>) -> Router {
    let api_routes = todo::api::v1::create_api_router(todo_state, auth_state);
    Router::new().nest("/api/v1", api_routes)
}
