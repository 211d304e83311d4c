use crate::error::ActionError;
use crate::logic::{ensure_turn, next_turn, TurnOutcome};
use crate::state::*;
use serde::{Deserialize, Serialize};

const DIRECTOR_FIVES: usize = 3;
const SHIFT_BET_ONES: usize = 4;
const HEIST_FIVES: usize = 4;
const BUY_CASINO_SUM: u32 = 30;

/// showBuyCasinoModal 中可供购买的赌场
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasinoOffer {
    pub id: CasinoId,
    pub name: String,
    pub top_card: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerOutcome {
    /// 能力生效并结束了回合
    TurnEnded(TurnOutcome),
    /// Buy Casino：等待玩家从这些赌场中选一个
    BuyOffered(Vec<CasinoOffer>),
}

/// 发动能力。条件按当前掷骰（不含金骰子）判断，每次掷骰只能发动一次。
pub fn activate_power(state: &mut GameState, player_id: PlayerId, power: PowerKind) -> Result<PowerOutcome, ActionError> {
    ensure_power_window(state, player_id)?;
    if state.power_used_this_roll {
        return Err(ActionError::PowerAlreadyUsed);
    }

    let idx = state.current_player_index;
    match power {
        PowerKind::Director => {
            if state.count_face(5) < DIRECTOR_FIVES {
                return Err(ActionError::PowerRequirementNotMet("director"));
            }
            state.players[idx].powers.immunity = true;
            Ok(PowerOutcome::TurnEnded(end_turn_by_power(state)))
        }
        PowerKind::ShiftBet => {
            if state.count_face(1) < SHIFT_BET_ONES {
                return Err(ActionError::PowerRequirementNotMet("shiftBet"));
            }
            // 只记录标记，轮末不做任何结算
            state.players[idx].powers.shift_bet_unlocked = true;
            Ok(PowerOutcome::TurnEnded(end_turn_by_power(state)))
        }
        PowerKind::DiceHeist => {
            if state.count_face(5) < HEIST_FIVES || state.turn_number as usize <= state.players.len() {
                return Err(ActionError::PowerRequirementNotMet("diceHeist"));
            }
            steal_die(state, idx);
            Ok(PowerOutcome::TurnEnded(end_turn_by_power(state)))
        }
        PowerKind::BuyCasino => {
            let sum: u32 = state.rolled_faces().map(u32::from).sum();
            if sum < BUY_CASINO_SUM {
                return Err(ActionError::PowerRequirementNotMet("buyCasino"));
            }
            let offers = buyable_casinos(state);
            if offers.is_empty() {
                return Err(ActionError::PowerRequirementNotMet("buyCasino"));
            }
            state.power_used_this_roll = true;
            state.buy_offer_open = true;
            Ok(PowerOutcome::BuyOffered(offers))
        }
    }
}

/// 买下赌场：直接拿走其最大的一张钞票计入得分，然后结束回合
pub fn buy_casino(state: &mut GameState, player_id: PlayerId, casino_id: CasinoId) -> Result<(u32, TurnOutcome), ActionError> {
    ensure_power_window(state, player_id)?;
    if !state.buy_offer_open {
        return Err(ActionError::NoPurchaseOffered);
    }

    let casino = state
        .casino_mut(casino_id)
        .filter(|c| !c.closed && !c.money.is_empty())
        .ok_or(ActionError::CasinoUnavailable(casino_id))?;
    let prize = casino.money.remove(0);

    let idx = state.current_player_index;
    state.players[idx].score += prize;
    Ok((prize, end_turn_by_power(state)))
}

/// 给金骰子指定点数
pub fn set_golden_die(state: &mut GameState, player_id: PlayerId, face: u8) -> Result<(), ActionError> {
    ensure_turn(state, player_id)?;
    if !(1..=6).contains(&face) {
        return Err(ActionError::InvalidFace(face));
    }
    let slot = state
        .current_roll
        .iter_mut()
        .find(|d| **d == Die::Wildcard)
        .ok_or(ActionError::NoWildcard)?;
    *slot = Die::Face(face);
    Ok(())
}

pub fn buyable_casinos(state: &GameState) -> Vec<CasinoOffer> {
    state
        .casinos
        .iter()
        .filter(|c| !c.closed)
        .filter_map(|c| {
            c.money.first().map(|&top| CasinoOffer { id: c.id, name: c.name.clone(), top_card: top })
        })
        .collect()
}

fn ensure_power_window(state: &GameState, player_id: PlayerId) -> Result<(), ActionError> {
    if state.mode != GameMode::Powers {
        return Err(ActionError::WrongMode);
    }
    ensure_turn(state, player_id)?;
    if !state.has_roll() {
        return Err(ActionError::NoRollPending);
    }
    Ok(())
}

/// 从剩余骰子最多的其他玩家处拿走一颗（并列时取最早加入的）
fn steal_die(state: &mut GameState, thief_idx: usize) {
    let mut victim: Option<usize> = None;
    for (i, p) in state.players.iter().enumerate() {
        if i == thief_idx || p.dice == 0 {
            continue;
        }
        if victim.is_none_or(|v| p.dice > state.players[v].dice) {
            victim = Some(i);
        }
    }

    if let Some(v) = victim {
        state.players[v].dice -= 1;
        state.players[v].dice_heisted -= 1;
        state.players[thief_idx].dice += 1;
        state.players[thief_idx].dice_heisted += 1;
    }
}

/// 能力结束回合：本次掷出的骰子作废，不放到任何赌场
fn end_turn_by_power(state: &mut GameState) -> TurnOutcome {
    let idx = state.current_player_index;
    let rolled = state.current_roll.len() as u8;
    let player = &mut state.players[idx];
    let discarded = rolled.min(player.dice);
    player.dice -= discarded;
    player.dice_discarded += discarded;
    next_turn(state)
}
