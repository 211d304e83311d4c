use crate::lobby::LobbyPlayer;
use crate::powers::CasinoOffer;
use crate::state::{CasinoId, GameMode, GameState, Player, PlayerId, PowerKind};
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的消息 ---
// 这些是客户端可以发送给服务器的指令或动作。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    // --- 大厅消息 ---
    /// 以给定昵称加入大厅
    JoinLobby { name: String },
    /// 切换准备状态
    PlayerReady,
    /// 房主选择游戏模式
    ModeSelected { mode: GameMode },

    // --- 游戏内消息 ---
    RollDice,
    /// 把所有该点数的骰子放到同编号的赌场
    PlaceDice { face_value: u8 },
    ActivatePower { power: PowerKind },
    /// 在 Buy Casino 能力展示的候选中选择一个赌场
    BuyCasino { casino_id: CasinoId },
    /// 给金骰子指定点数 (1-6)
    SetGoldenDie { face: u8 },
    /// 游戏结束后回到大厅
    PlayAgain,
}

// --- 服务器 -> 客户端 的消息 ---
// 除了 Connected / LobbyFull / ShowBuyCasinoModal 是单发给某个连接，其余都是广播。

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    /// 建立连接后告知客户端自己的ID
    Connected { your_id: PlayerId },

    // --- 大厅消息 ---
    LobbyUpdate { players: Vec<LobbyPlayer>, host_id: Option<PlayerId> },
    /// 大厅已满，只发给被拒绝的加入者
    LobbyFull { max_players: usize },
    /// 所有人已准备，等待房主选择模式
    ShowModeSelection { host_id: PlayerId },
    GameStarted,

    // --- 游戏状态更新消息 ---
    /// 完整游戏状态的快照，客户端据此渲染全部界面
    GameStateUpdate(GameState),
    RoundOver { round_number: u32 },
    GameOver { winner: Player },
    BackToLobby,
    /// 游戏中有人断线，整个会话已重置
    GameReset,
    /// 只发给发动 Buy Casino 的玩家
    ShowBuyCasinoModal { open_casinos: Vec<CasinoOffer> },
}

impl From<PowerKind> for ClientMessage {
    fn from(power: PowerKind) -> Self {
        ClientMessage::ActivatePower { power }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_names() {
        let msg: ClientMessage = serde_json::from_str(r#"{"placeDice":{"face_value":5}}"#).unwrap();
        assert_eq!(msg, ClientMessage::PlaceDice { face_value: 5 });

        let msg: ClientMessage = serde_json::from_str(r#""rollDice""#).unwrap();
        assert_eq!(msg, ClientMessage::RollDice);

        let msg: ClientMessage = serde_json::from_str(r#"{"activatePower":{"power":"diceHeist"}}"#).unwrap();
        assert_eq!(msg, ClientMessage::from(PowerKind::DiceHeist));

        let msg: ClientMessage = serde_json::from_str(r#"{"modeSelected":{"mode":"powers"}}"#).unwrap();
        assert_eq!(msg, ClientMessage::ModeSelected { mode: GameMode::Powers });
    }

    #[test]
    fn test_snapshot_hides_event_deck() {
        let mut state = GameState::new(GameMode::Powers, Vec::new());
        state.event_deck = crate::events::EventDeck::shuffled(&mut crate::rng::GameRng::from_seed(1));

        let json = serde_json::to_value(ServerMessage::GameStateUpdate(state)).unwrap();
        let snapshot = &json["gameStateUpdate"];
        assert_eq!(snapshot["mode"], "powers");
        assert!(snapshot.get("event_deck").is_none());
    }
}
