#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tasks_server::auth::{JwtTokenIssuer, TokenIssuer};
use tasks_server::cache::{CacheError, TodoCache};
use tasks_server::entities::todo::{self, TodoStatus};
use tasks_server::todo::TodoService;
use tasks_server::todo::repository::{
    CountTodoParams, InsertTodoParams, ListTodoParams, RepositoryError, TodoRepository,
    UpdateTodoParams,
};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, redis, testcontainers};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration_test_secret";

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_redis_container() -> anyhow::Result<testcontainers::ContainerAsync<redis::Redis>>
{
    let container = redis::Redis::default().start().await?;
    Ok(container)
}

/// Returns the bare `host:port` address of a running Redis container.
pub async fn redis_addr(
    container: &testcontainers::ContainerAsync<redis::Redis>,
) -> anyhow::Result<String> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(redis::REDIS_PORT).await?;
    Ok(format!("{}:{}", host, port))
}

/// Task store kept in memory, ordered by ID like the real store.
#[derive(Default)]
pub struct InMemoryTodoRepository {
    rows: Mutex<BTreeMap<Uuid, todo::Model>>,
    get_calls: AtomicUsize,
}

impl InMemoryTodoRepository {
    /// Number of single-row reads served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn matches(row: &todo::Model, status: Option<TodoStatus>, search: Option<&str>) -> bool {
        status.is_none_or(|status| row.status == status)
            && search.is_none_or(|search| {
                row.title.contains(search) || row.description.contains(search)
            })
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn insert_todo(&self, params: InsertTodoParams) -> Result<todo::Model, RepositoryError> {
        let model = todo::Model {
            id: params.id,
            title: params.title,
            description: params.description,
            status: TodoStatus::Pending,
            due_date: params.due_date,
            created_at: chrono::Utc::now().fixed_offset(),
        };
        self.rows.lock().unwrap().insert(model.id, model.clone());
        Ok(model)
    }

    async fn list_todos(&self, params: ListTodoParams) -> Result<Vec<todo::Model>, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|row| Self::matches(row, params.status, params.search.as_deref()))
            .skip(((params.page - 1) * params.limit) as usize)
            .take(params.limit as usize)
            .cloned()
            .collect())
    }

    async fn count_todos(&self, params: CountTodoParams) -> Result<u64, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|row| Self::matches(row, params.status, params.search.as_deref()))
            .count() as u64)
    }

    async fn get_todo_by_id(&self, id: Uuid) -> Result<todo::Model, RepositoryError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn update_todo(&self, params: UpdateTodoParams) -> Result<todo::Model, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&params.id)
            .ok_or(RepositoryError::NotFound(params.id))?;
        row.title = params.title;
        row.description = params.description;
        row.status = params.status;
        row.due_date = params.due_date;
        Ok(row.clone())
    }

    async fn delete_todo(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.rows
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }
}

/// Cache kept in memory. Expiry is recorded but never enforced.
#[derive(Default)]
pub struct InMemoryTodoCache {
    entries: Mutex<HashMap<String, (String, Duration)>>,
    set_calls: AtomicUsize,
}

impl InMemoryTodoCache {
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn entry(&self, key: &str) -> Option<(String, Duration)> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl TodoCache for InMemoryTodoCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }
}

/// Service and its in-memory dependencies, kept together so tests can inspect them.
pub struct TestServices {
    pub repo: Arc<InMemoryTodoRepository>,
    pub cache: Arc<InMemoryTodoCache>,
    pub issuer: Arc<dyn TokenIssuer>,
    pub service: TodoService,
}

pub fn setup_services() -> TestServices {
    let repo = Arc::new(InMemoryTodoRepository::default());
    let cache = Arc::new(InMemoryTodoCache::default());
    let issuer: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::new(TEST_SECRET.to_string()));
    let service = TodoService::new(repo.clone(), cache.clone(), issuer.clone());
    TestServices {
        repo,
        cache,
        issuer,
        service,
    }
}

/// Builds the full application router over in-memory dependencies.
pub fn setup_app(services: &TestServices) -> Router {
    tasks_server::web::create_app(
        services.service.clone(),
        services.issuer.clone(),
        Duration::from_secs(30),
    )
}

pub fn bearer_header(services: &TestServices) -> String {
    format!("Bearer {}", services.issuer.issue().unwrap())
}
