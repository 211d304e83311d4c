use crate::events::EventDeck;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type PlayerId = Uuid;
pub type CasinoId = u8;

/// 按加入顺序分配的玩家颜色
pub const PLAYER_COLORS: [&str; 6] = ["#e74c3c", "#3498db", "#2ecc71", "#f1c40f", "#9b59b6", "#e67e22"];

pub const CASINO_NAMES: [&str; 6] = [
    "Lucky Star",
    "Silver Dune",
    "Royal Flamingo",
    "Neon Palace",
    "Desert Rose",
    "Grand Oasis",
];

pub const CASINO_COUNT: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// 经典规则：只有掷骰和放骰
    Classic,
    /// 能力模式：每回合抽事件牌，特定点数组合可以触发能力
    Powers,
}

impl std::str::FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(GameMode::Classic),
            "powers" => Ok(GameMode::Powers),
            other => Err(format!("未知的游戏模式: {}", other)),
        }
    }
}

/// 掷骰结果中的一格：普通点数，或者等待玩家指定点数的金骰子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Die {
    Face(u8),
    Wildcard,
}

impl Die {
    pub fn face(&self) -> Option<u8> {
        match self {
            Die::Face(f) => Some(*f),
            Die::Wildcard => None,
        }
    }
}

/// 玩家持有的能力标记，每轮开始时清空
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Powers {
    /// 抵挡下一张事件牌
    pub immunity: bool,
    /// 解锁了 Shift Bet（目前没有结算效果）
    pub shift_bet_unlocked: bool,
    /// 下一次掷骰的最后一颗变成金骰子
    pub golden_die_pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub score: u32,
    pub dice: u8, // 本轮剩余骰子
    pub powers: Powers,
    // 因能力结束回合而作废的骰子数（本轮）
    pub dice_discarded: u8,
    // 通过 Dice Heist 净得到的骰子数（本轮，可为负）
    pub dice_heisted: i8,
}

impl Player {
    pub fn new(id: PlayerId, name: String, join_index: usize) -> Self {
        Player {
            id,
            name,
            color: PLAYER_COLORS[join_index % PLAYER_COLORS.len()].to_string(),
            score: 0,
            dice: 0,
            powers: Powers::default(),
            dice_discarded: 0,
            dice_heisted: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Casino {
    pub id: CasinoId,
    pub name: String,
    pub money: Vec<u32>, // 从大到小排列
    pub placed_dice: BTreeMap<PlayerId, u8>,
    pub closed: bool,
}

impl Casino {
    pub fn new(id: CasinoId) -> Self {
        Casino {
            id,
            name: CASINO_NAMES[(id - 1) as usize].to_string(),
            money: Vec::new(),
            placed_dice: BTreeMap::new(),
            closed: false,
        }
    }

    pub fn total_money(&self) -> u32 {
        self.money.iter().sum()
    }

    pub fn sort_money(&mut self) {
        self.money.sort_unstable_by(|a, b| b.cmp(a));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    MarketUp,
    MarketDown,
    CasinoAcquired,
    CasinoRenovated,
    CasinoAuctioned,
    EventDay,
    GoldenDie,
}

impl EventKind {
    pub fn title(&self) -> &'static str {
        match self {
            EventKind::MarketUp => "Market Up",
            EventKind::MarketDown => "Market Down",
            EventKind::CasinoAcquired => "Casino Acquired",
            EventKind::CasinoRenovated => "Casino Renovated",
            EventKind::CasinoAuctioned => "Casino Auctioned",
            EventKind::EventDay => "Event Day!",
            EventKind::GoldenDie => "Golden Die",
        }
    }
}

/// 最近一次抽到的事件牌及其结果，供客户端展示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastEvent {
    pub kind: EventKind,
    pub title: String,
    pub drawn_by: PlayerId,
    /// 受影响的赌场（只对针对单个赌场的事件有值）
    pub casino_id: Option<CasinoId>,
    /// 被免疫挡下
    pub blocked: bool,
}

/// 可以主动发动的能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerKind {
    Director,
    ShiftBet,
    DiceHeist,
    BuyCasino,
}

impl std::str::FromStr for PowerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "director" => Ok(PowerKind::Director),
            "shiftBet" | "shift-bet" => Ok(PowerKind::ShiftBet),
            "diceHeist" | "dice-heist" => Ok(PowerKind::DiceHeist),
            "buyCasino" | "buy-casino" => Ok(PowerKind::BuyCasino),
            other => Err(format!("未知的能力: {}", other)),
        }
    }
}

/// 一局游戏的完整状态。序列化后即发给客户端的快照（事件牌堆除外）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub mode: GameMode,
    pub players: Vec<Player>, // 按加入顺序
    pub casinos: Vec<Casino>,
    pub round_number: u32,
    pub turn_number: u32,
    pub current_player_index: usize,
    pub current_roll: Vec<Die>,
    pub round_over: bool,
    pub game_over: bool,

    pub last_event: Option<LastEvent>,
    pub event_drawn_this_turn: bool,
    pub power_used_this_roll: bool,
    // 已向当前玩家展示了可购买的赌场，等待其选择
    pub buy_offer_open: bool,

    // 服务端独有的事件牌堆，不会发给客户端
    #[serde(skip)]
    pub event_deck: EventDeck,
}

impl GameState {
    pub fn new(mode: GameMode, players: Vec<Player>) -> Self {
        GameState {
            mode,
            players,
            casinos: Vec::new(),
            round_number: 0,
            turn_number: 0,
            current_player_index: 0,
            current_roll: Vec::new(),
            round_over: false,
            game_over: false,
            last_event: None,
            event_drawn_this_turn: false,
            power_used_this_roll: false,
            buy_offer_open: false,
            event_deck: EventDeck::default(),
        }
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.current_player().map(|p| p.id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == *id)
    }

    pub fn casino(&self, id: CasinoId) -> Option<&Casino> {
        self.casinos.iter().find(|c| c.id == id)
    }

    pub fn casino_mut(&mut self, id: CasinoId) -> Option<&mut Casino> {
        self.casinos.iter_mut().find(|c| c.id == id)
    }

    pub fn total_remaining_dice(&self) -> u32 {
        self.players.iter().map(|p| p.dice as u32).sum()
    }

    /// 玩家本轮在所有赌场放下的骰子总数
    pub fn placed_by(&self, id: &PlayerId) -> u32 {
        self.casinos
            .iter()
            .filter_map(|c| c.placed_dice.get(id))
            .map(|&n| n as u32)
            .sum()
    }

    pub fn has_roll(&self) -> bool {
        !self.current_roll.is_empty()
    }

    pub fn has_wildcard(&self) -> bool {
        self.current_roll.contains(&Die::Wildcard)
    }

    /// 当前掷骰中已确定的点数（不含金骰子）
    pub fn rolled_faces(&self) -> impl Iterator<Item = u8> + '_ {
        self.current_roll.iter().filter_map(Die::face)
    }

    pub fn count_face(&self, face: u8) -> usize {
        self.rolled_faces().filter(|&f| f == face).count()
    }

    pub fn open_casino_ids(&self) -> Vec<CasinoId> {
        self.casinos.iter().filter(|c| !c.closed).map(|c| c.id).collect()
    }
}
