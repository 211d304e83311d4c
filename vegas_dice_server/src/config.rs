//! 服务器配置：统一从环境变量读取并校验。

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use vegas_dice_core::{GameConfig, LobbyFlow};

const DEFAULT_BIND: &str = "0.0.0.0:25917";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {var} 的值 {value:?} 无效: {reason}")]
    Invalid { var: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 监听地址
    pub bind: SocketAddr,
    /// 固定随机种子，用于复盘；不设置则使用系统熵
    pub seed: Option<u64>,
    pub game: GameConfig,
}

impl ServerConfig {
    /// 读取以下环境变量（均可省略）：
    ///
    /// - `VEGAS_BIND`：监听地址，默认 `0.0.0.0:25917`
    /// - `VEGAS_LOBBY_FLOW`：`host-selects`（默认）或 `auto-classic`
    /// - `VEGAS_SEED`：u64 随机种子
    /// - `VEGAS_SUMMARY_DELAY_MS` / `VEGAS_NEXT_ROUND_DELAY_MS`：回合间停顿
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = GameConfig::default();

        let bind = parse_env("VEGAS_BIND")?.unwrap_or_else(|| {
            DEFAULT_BIND.parse().unwrap_or(SocketAddr::from(([0, 0, 0, 0], 25917)))
        });
        let seed = parse_env::<u64>("VEGAS_SEED")?;
        let lobby_flow = parse_env::<LobbyFlow>("VEGAS_LOBBY_FLOW")?.unwrap_or(defaults.lobby_flow);
        let round_summary_delay = parse_env::<u64>("VEGAS_SUMMARY_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.round_summary_delay);
        let next_round_delay = parse_env::<u64>("VEGAS_NEXT_ROUND_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.next_round_delay);

        Ok(ServerConfig {
            bind,
            seed,
            game: GameConfig { lobby_flow, round_summary_delay, next_round_delay, ..defaults },
        })
    }
}

fn parse_env<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid { var, reason: e.to_string(), value }),
        Err(_) => Ok(None),
    }
}
