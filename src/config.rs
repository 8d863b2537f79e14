use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub db: Db,
    pub redis: Redis,
    pub queue: Queue,
    pub workers: Workers,
    pub cluster: Cluster,
    pub notifications: Notifications,
    pub portal: Portal,
    pub server: Server,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Db {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Redis {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Queue {
    pub lease_timeout_seconds: u64,
    pub idle_poll_ms: u64,
    pub reserve_error_threshold: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Workers {
    pub count: usize,
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Cluster {
    pub request_timeout_ms: u64,
    pub verify_tls: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Notifications {
    pub relay_url: Option<String>,
    pub from: String,
    pub subject_prefix: String,
    pub admins: Vec<String>,
    pub managers: Vec<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Portal {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Queue {
    pub fn lease(&self) -> time::Duration {
        time::Duration::seconds(self.lease_timeout_seconds as i64)
    }
}

/// Load settings from the base file (default `config/default`), `config/<env>.toml`,
/// and `WATCHER__*` env overrides.
pub fn load(path: Option<&str>) -> Result<Settings, config::ConfigError> {
    let env_name = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
    config::Config::builder()
        .add_source(config::File::with_name(path.unwrap_or("config/default")))
        .add_source(config::File::with_name(&format!("config/{env_name}")).required(false))
        .add_source(
            config::Environment::with_prefix("WATCHER")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("notifications.admins")
                .with_list_parse_key("notifications.managers")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    pub fn settings() -> Settings {
        Settings {
            db: Db {
                url: "postgres://localhost/portal".to_string(),
                max_connections: 5,
            },
            redis: Redis {
                url: "redis://127.0.0.1/".to_string(),
            },
            queue: Queue {
                lease_timeout_seconds: 120,
                idle_poll_ms: 100,
                reserve_error_threshold: 30,
            },
            workers: Workers {
                count: 2,
                shutdown_grace_ms: 200,
            },
            cluster: Cluster {
                request_timeout_ms: 1000,
                verify_tls: false,
            },
            notifications: Notifications {
                relay_url: None,
                from: "portal@example.org".to_string(),
                subject_prefix: "[portal] ".to_string(),
                admins: vec!["ops@example.org".to_string()],
                managers: vec!["helpdesk@example.org".to_string()],
                request_timeout_ms: 1000,
            },
            portal: Portal {
                base_url: "https://portal.example.org".to_string(),
            },
            server: Server {
                enabled: false,
                host: "127.0.0.1".to_string(),
                port: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::load;
    use std::io::Write;

    #[test]
    fn given_config_file_when_loaded_should_deserialize_all_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[db]
url = "postgres://db/portal"
max_connections = 4

[redis]
url = "redis://cache/"

[queue]
lease_timeout_seconds = 90
idle_poll_ms = 250
reserve_error_threshold = 30

[workers]
count = 10
shutdown_grace_ms = 5000

[cluster]
request_timeout_ms = 10000
verify_tls = false

[notifications]
from = "portal@example.org"
subject_prefix = "[portal] "
admins = ["ops@example.org"]
managers = []
request_timeout_ms = 5000

[portal]
base_url = "https://portal.example.org"

[server]
enabled = true
host = "0.0.0.0"
port = 9100
"#
        )
        .unwrap();

        let path = file.path().with_extension("");
        let settings = load(path.to_str()).unwrap();

        assert_eq!(settings.workers.count, 10);
        assert_eq!(settings.queue.lease().whole_seconds(), 90);
        assert_eq!(settings.notifications.relay_url, None);
        assert_eq!(settings.notifications.admins, vec!["ops@example.org"]);
        assert!(settings.server.enabled);
    }
}
