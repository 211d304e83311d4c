use crate::rng::GameRng;
use crate::state::*;
use tracing::info;

/// 事件牌堆的构成（每种牌的张数）
const DECK_TEMPLATE: [(EventKind, usize); 7] = [
    (EventKind::MarketUp, 2),
    (EventKind::MarketDown, 2),
    (EventKind::CasinoAcquired, 2),
    (EventKind::CasinoRenovated, 2),
    (EventKind::CasinoAuctioned, 2),
    (EventKind::EventDay, 1),
    (EventKind::GoldenDie, 3),
];

const MARKET_STEP: u32 = 10_000;
const MARKET_FLOOR: u32 = 10_000;

/// 洗好的事件牌堆。每局只洗一次，抽完不再补充。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDeck {
    cards: Vec<EventKind>,
}

impl EventDeck {
    pub fn shuffled(rng: &mut GameRng) -> Self {
        let mut cards: Vec<EventKind> = DECK_TEMPLATE
            .iter()
            .flat_map(|&(kind, n)| std::iter::repeat_n(kind, n))
            .collect();
        rng.shuffle(&mut cards);
        EventDeck { cards }
    }

    pub fn from_cards(cards: Vec<EventKind>) -> Self {
        EventDeck { cards }
    }

    pub fn pop(&mut self) -> Option<EventKind> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// 为 `player_id` 抽一张事件牌并结算
///
/// 牌堆为空时什么也不做。抽牌者持有免疫时，效果被挡下并消耗免疫。
pub fn draw_event(state: &mut GameState, player_id: PlayerId, rng: &mut GameRng) {
    let Some(kind) = state.event_deck.pop() else { return };

    let immune = state.player(&player_id).is_some_and(|p| p.powers.immunity);
    if immune {
        if let Some(p) = state.player_mut(&player_id) {
            p.powers.immunity = false;
        }
        info!("玩家 {} 的免疫挡下了事件 {}", player_id, kind.title());
        state.last_event = Some(LastEvent {
            kind,
            title: kind.title().to_string(),
            drawn_by: player_id,
            casino_id: None,
            blocked: true,
        });
        return;
    }

    let casino_id = apply_event(state, kind, player_id, rng);
    info!("玩家 {} 抽到事件 {} (赌场 {:?})", player_id, kind.title(), casino_id);
    state.last_event = Some(LastEvent {
        kind,
        title: kind.title().to_string(),
        drawn_by: player_id,
        casino_id,
        blocked: false,
    });
}

/// 执行事件效果，返回受影响的单个赌场（如果有）
fn apply_event(state: &mut GameState, kind: EventKind, player_id: PlayerId, rng: &mut GameRng) -> Option<CasinoId> {
    match kind {
        EventKind::MarketUp => {
            state.casinos.iter_mut().for_each(|c| revalue(c, |v| v + MARKET_STEP));
            None
        }
        EventKind::MarketDown => {
            state
                .casinos
                .iter_mut()
                .for_each(|c| revalue(c, |v| v.saturating_sub(MARKET_STEP).max(MARKET_FLOOR)));
            None
        }
        EventKind::CasinoAcquired => {
            let id = pick_open_casino(state, rng)?;
            close_casino(state, id);
            Some(id)
        }
        EventKind::CasinoRenovated => revalue_random(state, rng, |v| v * 2),
        EventKind::CasinoAuctioned => revalue_random(state, rng, |v| v / 2),
        EventKind::EventDay => revalue_random(state, rng, |v| v * 5),
        EventKind::GoldenDie => {
            if let Some(p) = state.player_mut(&player_id) {
                p.powers.golden_die_pending = true;
            }
            None
        }
    }
}

fn pick_open_casino(state: &GameState, rng: &mut GameRng) -> Option<CasinoId> {
    let open = state.open_casino_ids();
    if open.is_empty() {
        return None;
    }
    Some(open[rng.pick_index(open.len())])
}

fn revalue(casino: &mut Casino, f: impl Fn(u32) -> u32) {
    casino.money.iter_mut().for_each(|v| *v = f(*v));
    casino.sort_money();
}

fn revalue_random(state: &mut GameState, rng: &mut GameRng, f: impl Fn(u32) -> u32) -> Option<CasinoId> {
    let id = pick_open_casino(state, rng)?;
    if let Some(casino) = state.casino_mut(id) {
        revalue(casino, f);
    }
    Some(id)
}

/// 关闭赌场：已放下的骰子退回给各自的主人
fn close_casino(state: &mut GameState, id: CasinoId) {
    let Some(casino) = state.casino_mut(id) else { return };
    casino.closed = true;
    let returned = std::mem::take(&mut casino.placed_dice);

    for (pid, count) in returned {
        if let Some(p) = state.player_mut(&pid) {
            p.dice += count;
        }
    }
}
