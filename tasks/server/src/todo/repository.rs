//! Store access for tasks.
//!
//! [`TodoRepository`] lists the queries the service needs, and
//! [`SeaOrmTodoRepository`] runs them against Postgres.

use crate::entities::todo::{self, TodoStatus};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::sea_query::LikeExpr;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No row matched the given ID.
    #[error("Task with ID {0} not found")]
    NotFound(Uuid),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTodoParams {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
}

/// Page, page size and filters for a list query. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTodoParams {
    pub page: u64,
    pub limit: u64,
    pub status: Option<TodoStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountTodoParams {
    pub status: Option<TodoStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTodoParams {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub due_date: NaiveDate,
}

/// Parameterized queries against the task store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Inserts a new row. Status is left to the column default.
    async fn insert_todo(&self, params: InsertTodoParams) -> Result<todo::Model, RepositoryError>;

    /// Returns one page of rows matching the filters, in creation order.
    async fn list_todos(&self, params: ListTodoParams) -> Result<Vec<todo::Model>, RepositoryError>;

    /// Counts all rows matching the filters, ignoring pagination.
    async fn count_todos(&self, params: CountTodoParams) -> Result<u64, RepositoryError>;

    async fn get_todo_by_id(&self, id: Uuid) -> Result<todo::Model, RepositoryError>;

    /// Overwrites every mutable field of an existing row.
    async fn update_todo(&self, params: UpdateTodoParams) -> Result<todo::Model, RepositoryError>;

    async fn delete_todo(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// `SeaORM` implementation of `TodoRepository`.
#[derive(Clone, Debug)]
pub struct SeaOrmTodoRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmTodoRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

/// Escapes LIKE wildcards and the escape character so search text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the query shared by list and count. A WHERE clause is added only for the filters given.
fn filtered_todos(status: Option<TodoStatus>, search: Option<&str>) -> Select<todo::Entity> {
    todo::Entity::find()
        .apply_if(status, |query, status| {
            query.filter(todo::Column::Status.eq(status))
        })
        .apply_if(search, |query, search| {
            let pattern = format!("%{}%", escape_like(search));
            query.filter(
                Condition::any()
                    .add(todo::Column::Title.like(LikeExpr::new(pattern.clone()).escape('\\')))
                    .add(todo::Column::Description.like(LikeExpr::new(pattern).escape('\\'))),
            )
        })
}

#[async_trait]
impl TodoRepository for SeaOrmTodoRepository {
    #[tracing::instrument(skip(self))]
    async fn insert_todo(&self, params: InsertTodoParams) -> Result<todo::Model, RepositoryError> {
        let active_model = todo::ActiveModel {
            id: ActiveValue::Set(params.id),
            title: ActiveValue::Set(params.title),
            description: ActiveValue::Set(params.description),
            due_date: ActiveValue::Set(params.due_date),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db.as_ref()).await?;
        Ok(created_model)
    }

    #[tracing::instrument(skip(self))]
    async fn list_todos(&self, params: ListTodoParams) -> Result<Vec<todo::Model>, RepositoryError> {
        let offset = params.page.saturating_sub(1).saturating_mul(params.limit);
        let todos = filtered_todos(params.status, params.search.as_deref())
            .order_by_asc(todo::Column::Id)
            .offset(offset)
            .limit(params.limit)
            .all(self.db.as_ref())
            .await?;
        Ok(todos)
    }

    #[tracing::instrument(skip(self))]
    async fn count_todos(&self, params: CountTodoParams) -> Result<u64, RepositoryError> {
        let count = filtered_todos(params.status, params.search.as_deref())
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }

    #[tracing::instrument(skip(self))]
    async fn get_todo_by_id(&self, id: Uuid) -> Result<todo::Model, RepositoryError> {
        todo::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound(id))
    }

    #[tracing::instrument(skip(self))]
    async fn update_todo(&self, params: UpdateTodoParams) -> Result<todo::Model, RepositoryError> {
        let active_model = todo::ActiveModel {
            id: ActiveValue::Unchanged(params.id),
            title: ActiveValue::Set(params.title),
            description: ActiveValue::Set(params.description),
            status: ActiveValue::Set(params.status),
            due_date: ActiveValue::Set(params.due_date),
            ..Default::default()
        };
        match active_model.update(self.db.as_ref()).await {
            Ok(updated_model) => Ok(updated_model),
            Err(DbErr::RecordNotUpdated) => Err(RepositoryError::NotFound(params.id)),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete_todo(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = todo::Entity::delete_by_id(id).exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}
