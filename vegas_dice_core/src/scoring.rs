use crate::state::*;
use serde::{Deserialize, Serialize};

/// 一次赌场结算中发出的一张钞票
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub casino_id: CasinoId,
    pub player_id: PlayerId,
    pub amount: u32,
}

/// 结算本轮所有赌场
///
/// 每个赌场按放下的骰子数从多到少处理：
/// - 最高数量有多人并列时，这些玩家全部出局，不拿钱；
/// - 只有一人时，他拿走当前最大的一张钞票，然后出局；
/// - 玩家或钞票任一耗尽即停止。
///
/// 拿到的钞票从赌场中移除并计入玩家得分。结果只取决于放置数量和钞票，可以完全复现。
pub fn calculate_round_winners(state: &mut GameState) -> Vec<Award> {
    let mut awards = Vec::new();

    for casino in state.casinos.iter_mut() {
        // BTreeMap 按玩家ID有序，稳定排序保证并列时的顺序也固定
        let mut contenders: Vec<(PlayerId, u8)> = casino
            .placed_dice
            .iter()
            .filter(|&(_, &n)| n > 0)
            .map(|(id, n)| (*id, *n))
            .collect();
        contenders.sort_by(|a, b| b.1.cmp(&a.1));

        let mut rest = contenders.as_slice();
        while !rest.is_empty() && !casino.money.is_empty() {
            let top = rest[0].1;
            let tied = rest.iter().take_while(|(_, n)| *n == top).count();
            if tied > 1 {
                rest = &rest[tied..];
                continue;
            }
            let prize = casino.money.remove(0);
            awards.push(Award { casino_id: casino.id, player_id: rest[0].0, amount: prize });
            rest = &rest[1..];
        }
    }

    for award in &awards {
        if let Some(p) = state.players.iter_mut().find(|p| p.id == award.player_id) {
            p.score += award.amount;
        }
    }
    awards
}

/// 最终赢家：得分最高的玩家，同分时取最早加入的
pub fn final_winner(state: &GameState) -> Option<&Player> {
    let mut best: Option<&Player> = None;
    for p in &state.players {
        if best.is_none_or(|b| p.score > b.score) {
            best = Some(p);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::tests::setup_round;

    fn place(state: &mut GameState, casino: CasinoId, placements: &[(PlayerId, u8)], money: &[u32]) {
        let c = state.casino_mut(casino).unwrap();
        c.placed_dice = placements.iter().copied().collect();
        c.money = money.to_vec();
    }

    fn clear_all(state: &mut GameState) {
        for c in state.casinos.iter_mut() {
            c.placed_dice.clear();
            c.money.clear();
        }
    }

    #[test]
    fn test_tied_leaders_are_disqualified() {
        let (mut state, _, ids) = setup_round(3, GameMode::Classic, 1);
        clear_all(&mut state);
        place(&mut state, 1, &[(ids[0], 3), (ids[1], 3), (ids[2], 1)], &[50_000, 40_000, 30_000]);

        let awards = calculate_round_winners(&mut state);
        assert_eq!(awards, vec![Award { casino_id: 1, player_id: ids[2], amount: 50_000 }]);
        assert_eq!(state.players[0].score, 0);
        assert_eq!(state.players[1].score, 0);
        assert_eq!(state.players[2].score, 50_000);
        assert_eq!(state.casino(1).unwrap().money, vec![40_000, 30_000]);
    }

    #[test]
    fn test_distinct_counts_take_cards_in_order() {
        let (mut state, _, ids) = setup_round(3, GameMode::Classic, 2);
        clear_all(&mut state);
        place(&mut state, 2, &[(ids[0], 1), (ids[1], 4), (ids[2], 2)], &[60_000, 20_000]);

        let awards = calculate_round_winners(&mut state);
        assert_eq!(awards.len(), 2, "只有两张钞票");
        assert_eq!(awards[0].player_id, ids[1]);
        assert_eq!(awards[0].amount, 60_000);
        assert_eq!(awards[1].player_id, ids[2]);
        assert_eq!(awards[1].amount, 20_000);
        assert_eq!(state.players[0].score, 0);
    }

    #[test]
    fn test_all_tied_means_no_award() {
        let (mut state, _, ids) = setup_round(2, GameMode::Classic, 3);
        clear_all(&mut state);
        place(&mut state, 6, &[(ids[0], 2), (ids[1], 2)], &[90_000]);
        assert!(calculate_round_winners(&mut state).is_empty());
        assert_eq!(state.casino(6).unwrap().money, vec![90_000]);
    }

    #[test]
    fn test_scoring_is_reproducible() {
        let (state, _, ids) = setup_round(4, GameMode::Classic, 4);
        let mut a = state.clone();
        clear_all(&mut a);
        place(&mut a, 3, &[(ids[0], 2), (ids[1], 2), (ids[2], 5), (ids[3], 1)], &[80_000, 50_000, 10_000]);
        place(&mut a, 4, &[(ids[3], 3), (ids[1], 1), (ids[2], 1)], &[70_000, 30_000]);
        let mut b = a.clone();

        let first = calculate_round_winners(&mut a);
        let second = calculate_round_winners(&mut b);
        assert_eq!(first, second);
        // 赌场3: ids[2] 拿 80k，然后 2/2 并列出局，ids[3] 拿 50k
        // 赌场4: ids[3] 拿 70k，然后 1/1 并列出局
        assert_eq!(a.players[2].score, 80_000);
        assert_eq!(a.players[3].score, 120_000);
        assert_eq!(a.players[0].score, 0);
        assert_eq!(a.players[1].score, 0);
    }

    #[test]
    fn test_final_winner_tie_goes_to_earliest_joiner() {
        let (mut state, _, ids) = setup_round(3, GameMode::Classic, 5);
        state.players[0].score = 100_000;
        state.players[1].score = 150_000;
        state.players[2].score = 150_000;
        assert_eq!(final_winner(&state).unwrap().id, ids[1]);

        state.players[2].score = 160_000;
        assert_eq!(final_winner(&state).unwrap().id, ids[2]);
    }
}
