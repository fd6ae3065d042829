pub mod config {
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub db_url: String,
        pub redis_addr: String,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default)]
        pub jwt_secret: String,
        #[serde(default = "default_request_timeout_secs")]
        pub request_timeout_secs: u64,
        #[serde(default = "default_shutdown_grace_secs")]
        pub shutdown_grace_secs: u64,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Returns the Redis connection URL, adding the `redis://` scheme to a bare `host:port`.
        pub fn redis_url(&self) -> String {
            if self.redis_addr.starts_with("redis://") || self.redis_addr.starts_with("rediss://") {
                self.redis_addr.clone()
            } else {
                format!("redis://{}", self.redis_addr)
            }
        }

        pub fn request_timeout(&self) -> Duration {
            Duration::from_secs(self.request_timeout_secs)
        }

        pub fn shutdown_grace(&self) -> Duration {
            Duration::from_secs(self.shutdown_grace_secs)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_secs() -> u64 {
        30
    }

    fn default_shutdown_grace_secs() -> u64 {
        20
    }

}
pub mod auth;
pub mod cache;
pub mod entities;
pub mod todo;
pub mod web;
