use crate::auth::{TokenError, TokenIssuer};
use crate::cache::{CACHE_TTL, CacheError, TodoCache, todo_key};
use crate::entities::todo::{self, TodoStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub mod api;
pub mod repository;

use repository::{
    CountTodoParams, InsertTodoParams, ListTodoParams, RepositoryError, TodoRepository,
    UpdateTodoParams,
};

/// Wire format for due dates, both at the API boundary and in the cache.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Public projection of a task, as returned by the API and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Todo {
    /// Time-ordered unique identifier
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    /// Due date in `YYYY-MM-DD` form
    pub due_date: String,
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Self {
            id: model.id.to_string(),
            title: model.title,
            description: model.description,
            status: model.status,
            due_date: model.due_date.format(DUE_DATE_FORMAT).to_string(),
        }
    }
}

/// Payload for creating a task.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Due date in `YYYY-MM-DD` form
    #[serde(default)]
    pub due_date: String,
}

/// Payload for replacing every field of a task.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// One of `pending` or `completed`
    #[serde(default)]
    pub status: String,
    /// Due date in `YYYY-MM-DD` form
    #[serde(default)]
    pub due_date: String,
}

/// Query parameters for listing tasks.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTodoQuery {
    /// 1-based page number, defaults to 1
    pub page: Option<i64>,
    /// Page size, defaults to 10
    pub limit: Option<i64>,
    /// Only return tasks with this status
    pub status: Option<String>,
    /// Only return tasks whose title or description contains this text
    pub search: Option<String>,
}

/// One page of tasks together with the pagination figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoPage {
    pub tasks: Vec<Todo>,
    pub total_tasks: u64,
    pub current_page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Number of pages reported for `total` matches at `limit` per page.
///
/// This is floor division: a partial last page is not counted.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    total / limit
}

/// Input that was rejected before reaching the store or the cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,
    #[error("due_date '{0}' must be a valid date in YYYY-MM-DD format")]
    InvalidDueDate(String),
    #[error("status '{0}' must be one of: pending, completed")]
    InvalidStatus(String),
    #[error("'{0}' is not a valid task id")]
    InvalidId(String),
    #[error("page must be at least 1, got {0}")]
    InvalidPage(i64),
    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(i64),
    #[error("page {page} is out of range for limit {limit}")]
    PageOutOfRange { page: i64, limit: i64 },
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Task with ID {0} not found")]
    NotFound(Uuid),
    #[error("Database error: {0}")]
    Database(sea_orm::DbErr),
    #[error("{0}")]
    Cache(#[from] CacheError),
    /// A cached value could not be read back as a task.
    #[error("Corrupt cache entry for key '{key}': {source}")]
    CorruptCacheEntry {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize task: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("Failed to issue token: {0}")]
    Token(#[from] TokenError),
}

impl TodoServiceError {
    /// Whether this error came from a dependency (store, cache, serializer or signer).
    pub fn is_dependency(&self) -> bool {
        !matches!(
            self,
            TodoServiceError::Validation(_) | TodoServiceError::NotFound(_)
        )
    }
}

impl From<RepositoryError> for TodoServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => TodoServiceError::NotFound(id),
            RepositoryError::Database(db_err) => TodoServiceError::Database(db_err),
        }
    }
}

/// Logs an error where it is detected and hands it back unchanged.
fn logged(err: impl Into<TodoServiceError>) -> TodoServiceError {
    let err = err.into();
    match &err {
        TodoServiceError::Validation(_) => tracing::warn!("Rejected input: {}", err),
        _ => tracing::error!("Todo operation failed: {}", err),
    }
    err
}

/// Parses a strict, zero-padded `YYYY-MM-DD` date.
pub fn parse_due_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DUE_DATE_FORMAT)
        .ok()
        .filter(|date| date.format(DUE_DATE_FORMAT).to_string() == value)
        .ok_or_else(|| ValidationError::InvalidDueDate(value.to_string()))
}

pub fn parse_id(value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value).map_err(|_| ValidationError::InvalidId(value.to_string()))
}

pub fn parse_status(value: &str) -> Result<TodoStatus, ValidationError> {
    value
        .parse()
        .map_err(|_| ValidationError::InvalidStatus(value.to_string()))
}

/// Orchestrates validation, id generation, the read-through cache and pagination for tasks.
#[derive(Clone)]
pub struct TodoService {
    repo: Arc<dyn TodoRepository>,
    cache: Arc<dyn TodoCache>,
    tokens: Arc<dyn TokenIssuer>,
}

impl TodoService {
    pub fn new(
        repo: Arc<dyn TodoRepository>,
        cache: Arc<dyn TodoCache>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self { repo, cache, tokens }
    }

    /// Creates a new task with a freshly generated, time-ordered ID.
    ///
    /// The cache is not touched; it is filled on the first read.
    ///
    /// # Returns
    ///
    /// The persisted task, including its generated ID and the store's default status.
    #[tracing::instrument(skip(self))]
    pub async fn create_todo(&self, request: CreateTodoRequest) -> Result<Todo, TodoServiceError> {
        if request.title.is_empty() {
            return Err(logged(ValidationError::MissingTitle));
        }
        let due_date = parse_due_date(&request.due_date).map_err(logged)?;

        let created = self
            .repo
            .insert_todo(InsertTodoParams {
                id: Uuid::now_v7(),
                title: request.title,
                description: request.description,
                due_date,
            })
            .await
            .map_err(logged)?;
        Ok(Todo::from(created))
    }

    /// Lists one page of tasks matching the optional status and search filters.
    ///
    /// The count query uses the same filters without pagination. Both queries
    /// must succeed; a failed count discards the page.
    #[tracing::instrument(skip(self))]
    pub async fn list_todos(&self, query: ListTodoQuery) -> Result<TodoPage, TodoServiceError> {
        let page = query.page.unwrap_or(DEFAULT_PAGE);
        if page < 1 {
            return Err(logged(ValidationError::InvalidPage(page)));
        }
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
        if limit < 1 {
            return Err(logged(ValidationError::InvalidLimit(limit)));
        }
        // The row offset is bound as a signed 64-bit integer.
        if (page - 1).checked_mul(limit).is_none() {
            return Err(logged(ValidationError::PageOutOfRange { page, limit }));
        }
        let status = query
            .status
            .as_deref()
            .map(parse_status)
            .transpose()
            .map_err(logged)?;
        let (page, limit) = (page as u64, limit as u64);

        let rows = self
            .repo
            .list_todos(ListTodoParams {
                page,
                limit,
                status,
                search: query.search.clone(),
            })
            .await
            .map_err(logged)?;

        let total_tasks = self
            .repo
            .count_todos(CountTodoParams {
                status,
                search: query.search,
            })
            .await
            .map_err(logged)?;

        Ok(TodoPage {
            tasks: rows.into_iter().map(Todo::from).collect(),
            total_tasks,
            current_page: page,
            limit,
            total_pages: total_pages(total_tasks, limit),
        })
    }

    /// Retrieves a task by ID through the cache.
    ///
    /// A hit is returned as stored. On a miss the store is read and the result
    /// cached for [`CACHE_TTL`]. Any other cache failure, a corrupt cache entry
    /// or a failed cache write fails the request without falling back to the store.
    #[tracing::instrument(skip(self))]
    pub async fn get_todo(&self, id: &str) -> Result<Todo, TodoServiceError> {
        let todo_id = parse_id(id).map_err(logged)?;
        let key = todo_key(id);

        if let Some(cached) = self.cache.get(&key).await.map_err(logged)? {
            return serde_json::from_str(&cached)
                .map_err(|source| logged(TodoServiceError::CorruptCacheEntry { key, source }));
        }

        let todo = Todo::from(self.repo.get_todo_by_id(todo_id).await.map_err(logged)?);
        let payload = serde_json::to_string(&todo)
            .map_err(|err| logged(TodoServiceError::Serialization(err)))?;
        self.cache
            .set(&key, &payload, CACHE_TTL)
            .await
            .map_err(logged)?;
        Ok(todo)
    }

    /// Replaces every field of an existing task.
    ///
    /// The cached copy, if any, is left in place and keeps being served until it expires.
    #[tracing::instrument(skip(self))]
    pub async fn update_todo(
        &self,
        id: &str,
        request: UpdateTodoRequest,
    ) -> Result<Todo, TodoServiceError> {
        let due_date = parse_due_date(&request.due_date).map_err(logged)?;
        let todo_id = parse_id(id).map_err(logged)?;
        if request.title.is_empty() {
            return Err(logged(ValidationError::MissingTitle));
        }
        let status = parse_status(&request.status).map_err(logged)?;

        let updated = self
            .repo
            .update_todo(UpdateTodoParams {
                id: todo_id,
                title: request.title,
                description: request.description,
                status,
                due_date,
            })
            .await
            .map_err(logged)?;
        Ok(Todo::from(updated))
    }

    /// Deletes a task by ID. The cached copy, if any, is not evicted.
    #[tracing::instrument(skip(self))]
    pub async fn delete_todo(&self, id: &str) -> Result<(), TodoServiceError> {
        let todo_id = parse_id(id).map_err(logged)?;
        self.repo.delete_todo(todo_id).await.map_err(logged)?;
        Ok(())
    }

    /// Issues a bearer token valid for 24 hours.
    #[tracing::instrument(skip(self))]
    pub fn issue_token(&self) -> Result<String, TodoServiceError> {
        self.tokens.issue().map_err(logged)
    }
}
