use crate::state::PlayerId;
use thiserror::Error;

/// 加入大厅失败的原因。只有 `LobbyFull` 会通知到加入者，其余情况静默忽略。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("大厅已满（最多 {max_players} 人）")]
    LobbyFull { max_players: usize },

    #[error("连接 {0} 已经在大厅中")]
    AlreadyJoined(PlayerId),

    #[error("游戏已经开始，不能加入")]
    GameInProgress,

    #[error("玩家 {0} 不在大厅中")]
    NotInLobby(PlayerId),
}

/// 回合内操作被拒绝的原因。
///
/// 对状态机来说这些都是空操作：不改状态、不广播，只在日志里留痕。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("还没轮到玩家 {0}")]
    NotYourTurn(PlayerId),

    #[error("已经有一次未处理的掷骰")]
    RollPending,

    #[error("当前没有掷骰结果")]
    NoRollPending,

    #[error("金骰子尚未指定点数")]
    WildcardUnresolved,

    #[error("当前掷骰中没有金骰子")]
    NoWildcard,

    #[error("无效的点数 {0}")]
    InvalidFace(u8),

    #[error("赌场 {0} 已关闭")]
    CasinoClosed(u8),

    #[error("赌场 {0} 无法购买")]
    CasinoUnavailable(u8),

    #[error("本次掷骰已经使用过能力")]
    PowerAlreadyUsed,

    #[error("不满足能力 {0} 的条件")]
    PowerRequirementNotMet(&'static str),

    #[error("没有待选择的购买")]
    NoPurchaseOffered,

    #[error("该操作只在能力模式下可用")]
    WrongMode,

    #[error("回合之间不接受操作")]
    BetweenRounds,

    #[error("游戏已结束")]
    GameOver,
}
