use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 所有人准备好之后如何离开大厅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LobbyFlow {
    /// 直接开始经典模式
    AutoClassic,
    /// 由房主选择模式后开始
    HostSelects,
}

impl std::str::FromStr for LobbyFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto-classic" => Ok(LobbyFlow::AutoClassic),
            "host-selects" => Ok(LobbyFlow::HostSelects),
            other => Err(format!("未知的大厅流程: {}", other)),
        }
    }
}

/// 一局游戏的规则参数。`Default` 即标准规则。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub max_players: usize,
    pub min_players: usize,
    /// 每位玩家每轮分到的骰子数
    pub dice_per_player: u8,
    /// 一局的总轮数
    pub total_rounds: u32,
    /// 发钱时每个赌场至少要凑够的金额
    pub casino_floor: u32,
    /// 回合结算后到公布结果之间的停顿
    pub round_summary_delay: Duration,
    /// 公布本轮结束到下一轮开始之间的停顿
    pub next_round_delay: Duration,
    pub lobby_flow: LobbyFlow,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            max_players: 5,
            min_players: 2,
            dice_per_player: 8,
            total_rounds: 4,
            casino_floor: 50_000,
            round_summary_delay: Duration::from_millis(4000),
            next_round_delay: Duration::from_millis(2000),
            lobby_flow: LobbyFlow::HostSelects,
        }
    }
}
