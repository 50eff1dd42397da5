use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reward: RewardConfig,
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
}

/// Tunables for the batch reward core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Aggregator flush period in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    /// Fallback when a game omits its win probability.
    #[serde(default = "default_win_probability")]
    pub default_win_probability: f64,
    #[serde(default = "default_volatility_factor")]
    pub default_volatility_factor: f64,
    /// Largest batch a single flush may submit per game; the overflow stays
    /// buffered for the next tick.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_batch_retry_count")]
    pub batch_retry_count: u32,
    #[serde(default = "default_batch_retry_backoff_ms")]
    pub batch_retry_backoff_ms: u64,
    /// Seed for the shared RNG. Unset means seeded from OS entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_tick_period_ms() -> u64 {
    1000
}

fn default_win_probability() -> f64 {
    0.15
}

fn default_volatility_factor() -> f64 {
    1.2
}

fn default_max_batch_size() -> usize {
    5000
}

fn default_batch_retry_count() -> u32 {
    3
}

fn default_batch_retry_backoff_ms() -> u64 {
    10
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            tick_period_ms: default_tick_period_ms(),
            default_win_probability: default_win_probability(),
            default_volatility_factor: default_volatility_factor(),
            max_batch_size: default_max_batch_size(),
            batch_retry_count: default_batch_retry_count(),
            batch_retry_backoff_ms: default_batch_retry_backoff_ms(),
            rng_seed: None,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env("SERVER_PORT")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(8080),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env("DB_MAX_CONNECTIONS")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(10),
                    },
                    reward: RewardConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("TICK_PERIOD_MS")
            && let Ok(n) = v.parse()
        {
            config.reward.tick_period_ms = n;
        }
        if let Ok(v) = env::var("DEFAULT_WIN_PROBABILITY")
            && let Ok(p) = v.parse()
        {
            config.reward.default_win_probability = p;
        }
        if let Ok(v) = env::var("DEFAULT_VOLATILITY_FACTOR")
            && let Ok(f) = v.parse()
        {
            config.reward.default_volatility_factor = f;
        }
        if let Ok(v) = env::var("MAX_BATCH_SIZE")
            && let Ok(n) = v.parse()
        {
            config.reward.max_batch_size = n;
        }
        if let Ok(v) = env::var("BATCH_RETRY_COUNT")
            && let Ok(n) = v.parse()
        {
            config.reward.batch_retry_count = n;
        }
        if let Ok(v) = env::var("BATCH_RETRY_BACKOFF_MS")
            && let Ok(n) = v.parse()
        {
            config.reward.batch_retry_backoff_ms = n;
        }
        if let Ok(v) = env::var("RNG_SEED")
            && let Ok(s) = v.parse()
        {
            config.reward.rng_seed = Some(s);
        }

        Ok(config)
    }
}
