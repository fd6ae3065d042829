use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasks_server=info,tower_http=info".into()),
        )
        .init();
    let config = tasks_server::config::Config::from_env()?;
    tasks_server::web::start_web_server(config).await
}
