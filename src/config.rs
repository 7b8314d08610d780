use serde::{Deserialize, Serialize};
use std::env;

/// 以 memory:// 开头的数据库 URL 使用进程内存储（开发/演示）
pub const MEMORY_URL_PREFIX: &str = "memory://";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// 内存存储时是否写入演示餐厅 rest_001
    #[serde(default)]
    pub seed_demo: bool,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with(MEMORY_URL_PREFIX)
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::from_toml_str(&config_str),
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env(),
            Err(e) => Err(format!("Failed to read config file {config_path}: {e}").into()),
        }
    }

    /// 解析 TOML 文本，随后用环境变量覆盖
    pub fn from_toml_str(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config: Config =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// 无配置文件：使用环境变量与默认值构建
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        fn get_env(name: &str) -> Option<String> {
            env::var(name).ok()
        }
        fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
            env::var(name)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        // 数据库 URL 在无配置文件时必须提供
        let database_url = get_env("DATABASE_URL")
            .ok_or("DATABASE_URL is not set and no config.toml was found")?;

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                seed_demo: get_env_parse("DB_SEED_DEMO", false),
            },
        })
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("DB_SEED_DEMO")
            && let Ok(seed) = v.parse()
        {
            self.database.seed_demo = seed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_file() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "memory://"
            max_connections = 4
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.max_connections, 4);
        assert!(!config.database.seed_demo);
        assert!(config.database.is_memory());
    }

    #[test]
    fn test_postgres_url_is_not_memory() {
        let db = DatabaseConfig {
            url: "postgres://spinserve@localhost/spinserve".into(),
            max_connections: 10,
            seed_demo: false,
        };
        assert!(!db.is_memory());
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(Config::from_toml_str("[server]\nport = \"eighty\"").is_err());
    }
}
