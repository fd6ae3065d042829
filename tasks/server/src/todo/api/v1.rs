use crate::auth::api::v1::{AuthState, require_bearer_auth};
use crate::todo::{
    CreateTodoRequest, ListTodoQuery, Todo, TodoPage, TodoService, TodoServiceError,
    UpdateTodoRequest,
};
use crate::web::api::ErrorResponse;
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct TodoState {
    pub service: TodoService,
}

impl TodoState {
    pub fn new(service: TodoService) -> Self {
        Self { service }
    }
}

/// Response carrying a single task and a confirmation message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub message: String,
    pub task: Todo,
}

/// Response carrying only a confirmation message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub current_page: u64,
    /// Matching tasks divided by the page size, rounded down
    pub total_page: u64,
    pub total_tasks: u64,
}

/// API response for listing tasks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListTasksResponse {
    pub tasks: Vec<Todo>,
    pub pagination: Pagination,
}

impl From<TodoPage> for ListTasksResponse {
    fn from(page: TodoPage) -> Self {
        Self {
            tasks: page.tasks,
            pagination: Pagination {
                current_page: page.current_page,
                total_page: page.total_pages,
                total_tasks: page.total_tasks,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Error type for task handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body or query string could not be decoded.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Service(#[from] TodoServiceError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Not-found is reported as a server error, like every other non-validation failure.
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Service(TodoServiceError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Handler for POST /api/v1/tasks - Creates a task.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTodoRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TodoState>>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let Json(request) = payload?;
    let task = state.service.create_todo(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            message: "Task created successfully".to_string(),
            task,
        }),
    ))
}

/// Handler for GET /api/v1/tasks - Returns one page of tasks.
#[tracing::instrument(skip(state, query))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(ListTodoQuery),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = ListTasksResponse),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TodoState>>,
    query: Result<Query<ListTodoQuery>, QueryRejection>,
) -> Result<Json<ListTasksResponse>, ApiError> {
    let Query(query) = query?;
    let page = state.service.list_todos(query).await?;
    Ok(Json(ListTasksResponse::from(page)))
}

/// Handler for GET /api/v1/tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Successfully retrieved task", body = Todo),
        (status = 400, description = "Malformed task ID", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Task not found or internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let task = state.service.get_todo(&id).await?;
    Ok(Json(task))
}

/// Handler for PUT /api/v1/tasks/{id} - Replaces a task.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Task not found or internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let Json(request) = payload?;
    let task = state.service.update_todo(&id, request).await?;
    Ok(Json(TaskResponse {
        message: "Task updated successfully".to_string(),
        task,
    }))
}

/// Handler for DELETE /api/v1/tasks/{id} - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 400, description = "Malformed task ID", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Task not found or internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.delete_todo(&id).await?;
    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// Handler for GET /api/v1/token - Issues a bearer token valid for 24 hours.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/token",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 500, description = "Token could not be signed", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn get_token_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.service.issue_token()?;
    Ok(Json(TokenResponse { token }))
}

/// Creates the task router. Every `/tasks` route requires a bearer token; `/token` is public.
pub fn create_api_router(state: Arc<TodoState>, auth_state: Arc<AuthState>) -> Router {
    let protected_routes = Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .route_layer(from_fn_with_state(auth_state, require_bearer_auth));

    Router::new()
        .route("/token", get(get_token_handler))
        .merge(protected_routes)
        .with_state(state)
}
