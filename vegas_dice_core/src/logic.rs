use crate::config::GameConfig;
use crate::error::ActionError;
use crate::events;
use crate::rng::GameRng;
use crate::state::*;

/// 每轮重新洗的钞票牌
pub const MONEY_DECK: [u32; 10] = [90_000, 80_000, 70_000, 60_000, 50_000, 50_000, 40_000, 30_000, 20_000, 10_000];

/// 一次操作之后回合的走向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// 行动权交给了这位玩家
    NextPlayer(PlayerId),
    /// 所有骰子都已用完，本轮结束
    RoundEnded,
}

// --- 核心回合流程函数 ---

/// 开始新的一轮
///
/// - 轮数加一，每位玩家重新拿到全部骰子，能力标记清空。
/// - 重建六个空赌场，从新的一副钞票牌中发钱。
/// - 行动权交给第一位玩家。
pub fn start_new_round(state: &mut GameState, config: &GameConfig, rng: &mut GameRng) {
    state.round_number += 1;
    state.round_over = false;
    state.game_over = false;

    for player in state.players.iter_mut() {
        player.dice = config.dice_per_player;
        player.powers = Powers::default();
        player.dice_discarded = 0;
        player.dice_heisted = 0;
    }

    state.casinos = (1..=CASINO_COUNT).map(Casino::new).collect();
    deal_money(&mut state.casinos, config.casino_floor, rng);

    state.current_roll.clear();
    state.current_player_index = 0;
    state.turn_number = 0;
    state.last_event = None;
    state.event_drawn_this_turn = false;
    state.power_used_this_roll = false;
    state.buy_offer_open = false;
}

/// 按赌场编号依次发钱，每个赌场抽到总额不低于 `floor` 为止。
///
/// 牌抽完就停，后面的赌场可能拿得少甚至为空。
pub fn deal_money(casinos: &mut [Casino], floor: u32, rng: &mut GameRng) {
    let mut deck = MONEY_DECK.to_vec();
    for casino in casinos.iter_mut() {
        while casino.total_money() < floor && !deck.is_empty() {
            let idx = rng.pick_index(deck.len());
            casino.money.push(deck.swap_remove(idx));
        }
        casino.sort_money();
    }
}

/// 当前玩家掷骰
///
/// 能力模式下，本轮第一回合之后每回合第一次掷骰前先抽一张事件牌。
/// 持有金骰子标记时，最后一颗骰子变成金骰子，由玩家另行指定点数。
pub fn roll_dice(state: &mut GameState, player_id: PlayerId, rng: &mut GameRng) -> Result<(), ActionError> {
    ensure_turn(state, player_id)?;
    if state.has_roll() {
        return Err(ActionError::RollPending);
    }

    if state.mode == GameMode::Powers && state.turn_number > 0 && !state.event_drawn_this_turn {
        state.event_drawn_this_turn = true;
        events::draw_event(state, player_id, rng);
    }

    let idx = state.current_player_index;
    let dice_count = state.players[idx].dice;
    let mut roll: Vec<Die> = (0..dice_count).map(|_| Die::Face(rng.roll_die())).collect();

    let player = &mut state.players[idx];
    if player.powers.golden_die_pending {
        if let Some(last) = roll.last_mut() {
            *last = Die::Wildcard;
            player.powers.golden_die_pending = false;
        }
    }

    state.current_roll = roll;
    state.power_used_this_roll = false;
    Ok(())
}

/// 把当前掷骰中所有点数为 `face` 的骰子放到对应编号的赌场
///
/// 没有这个点数的骰子也是合法操作，只是什么都不放，行动权照样转移。
pub fn place_dice(state: &mut GameState, player_id: PlayerId, face: u8) -> Result<TurnOutcome, ActionError> {
    ensure_turn(state, player_id)?;
    if !state.has_roll() {
        return Err(ActionError::NoRollPending);
    }
    if state.has_wildcard() {
        return Err(ActionError::WildcardUnresolved);
    }
    if !(1..=CASINO_COUNT).contains(&face) {
        return Err(ActionError::InvalidFace(face));
    }

    let count = state.count_face(face) as u8;
    if count > 0 {
        let casino = state.casino_mut(face).ok_or(ActionError::InvalidFace(face))?;
        if casino.closed {
            return Err(ActionError::CasinoClosed(face));
        }
        *casino.placed_dice.entry(player_id).or_insert(0) += count;

        let idx = state.current_player_index;
        state.players[idx].dice -= count;
    }

    Ok(next_turn(state))
}

/// 把行动权交给下一位还有骰子的玩家；所有人都没有骰子时本轮结束
pub fn next_turn(state: &mut GameState) -> TurnOutcome {
    state.current_roll.clear();
    state.power_used_this_roll = false;
    state.buy_offer_open = false;

    if state.total_remaining_dice() == 0 {
        state.round_over = true;
        return TurnOutcome::RoundEnded;
    }

    let n = state.players.len();
    let mut idx = state.current_player_index;
    loop {
        idx = (idx + 1) % n;
        if state.players[idx].dice > 0 {
            break;
        }
    }

    state.current_player_index = idx;
    state.turn_number += 1;
    state.event_drawn_this_turn = false;
    TurnOutcome::NextPlayer(state.players[idx].id)
}

// --- 辅助逻辑函数 ---

/// 校验阶段和行动权：回合之间、游戏结束后、非当前玩家都会被拒绝
pub(crate) fn ensure_turn(state: &GameState, player_id: PlayerId) -> Result<(), ActionError> {
    if state.game_over {
        return Err(ActionError::GameOver);
    }
    if state.round_over {
        return Err(ActionError::BetweenRounds);
    }
    if state.current_player_id() != Some(player_id) {
        return Err(ActionError::NotYourTurn(player_id));
    }
    Ok(())
}

// --- 单元测试 ---
