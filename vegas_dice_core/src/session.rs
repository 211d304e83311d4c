use crate::config::{GameConfig, LobbyFlow};
use crate::error::{ActionError, LobbyError};
use crate::events::EventDeck;
use crate::lobby::Lobby;
use crate::logic::{self, TurnOutcome};
use crate::message::{ClientMessage, ServerMessage};
use crate::powers::{self, CasinoOffer, PowerOutcome};
use crate::rng::GameRng;
use crate::scheduler::{ScheduledTransition, Scheduler, Transition};
use crate::scoring;
use crate::state::{GameMode, GameState, PlayerId};
use std::time::Duration;
use tracing::{debug, info};

/// 控制器产生的待发送消息，由传输层投递
#[derive(Debug, Clone)]
pub enum Outbound {
    /// 发给所有连接
    Broadcast(ServerMessage),
    /// 只发给某一个连接
    Direct(PlayerId, ServerMessage),
}

/// 一次会话的全部可变状态：大厅、对局和待执行的定时转换。
/// 第一次有人加入时创建，重置或再来一局时整体替换。
#[derive(Debug)]
struct Session {
    lobby: Lobby,
    game: Option<GameState>,
    scheduler: Scheduler,
    mode_selection_open: bool,
}

impl Session {
    fn new(config: &GameConfig) -> Self {
        Session {
            lobby: Lobby::new(config.max_players, config.min_players),
            game: None,
            scheduler: Scheduler::default(),
            mode_selection_open: false,
        }
    }

    fn lobby_update(&self) -> ServerMessage {
        ServerMessage::LobbyUpdate { players: self.lobby.snapshot(), host_id: self.lobby.host_id() }
    }
}

// 一次回合内操作成功后的后续动作
enum Step {
    Updated,
    Turn(TurnOutcome),
    Offer(Vec<CasinoOffer>),
}

/// 会话控制器：所有玩家意图的唯一入口。
///
/// 调用方保证同一时间只有一个调用在执行（服务端用一把锁包住它）。
/// 每个方法都是"校验 - 修改 - 产出消息"一步完成；校验失败时返回空列表，状态不变。
/// `now` 是会话时钟上的当前时间，只用于安排回合之间的定时转换。
pub struct SessionController {
    config: GameConfig,
    rng: GameRng,
    session: Option<Session>,
}

impl SessionController {
    pub fn new(config: GameConfig, rng: GameRng) -> Self {
        SessionController { config, rng, session: None }
    }

    pub fn lobby(&self) -> Option<&Lobby> {
        self.session.as_ref().map(|s| &s.lobby)
    }

    pub fn game(&self) -> Option<&GameState> {
        self.session.as_ref().and_then(|s| s.game.as_ref())
    }

    /// 最早一个待执行转换的到期时间
    pub fn next_deadline(&self) -> Option<Duration> {
        self.session.as_ref().and_then(|s| s.scheduler.next_deadline())
    }

    /// 新连接：补发当前大厅和对局状态
    pub fn connect(&mut self, conn: PlayerId) -> Vec<Outbound> {
        let Some(session) = self.session.as_ref() else { return Vec::new() };
        let mut out = vec![Outbound::Direct(conn, session.lobby_update())];
        if let Some(game) = &session.game {
            out.push(Outbound::Direct(conn, ServerMessage::GameStateUpdate(game.clone())));
        }
        out
    }

    pub fn handle(&mut self, conn: PlayerId, msg: ClientMessage, now: Duration) -> Vec<Outbound> {
        match msg {
            ClientMessage::JoinLobby { name } => self.join(conn, &name),
            ClientMessage::PlayerReady => self.toggle_ready(conn),
            ClientMessage::ModeSelected { mode } => self.select_mode(conn, mode),
            ClientMessage::PlayAgain => self.play_again(conn),
            action => self.game_action(conn, action, now),
        }
    }

    /// 连接断开。开局前只是离开大厅；对局中断线会重置整个会话。
    /// 断线从不安排定时转换，所以不需要 `now`。
    pub fn disconnect(&mut self, conn: PlayerId) -> Vec<Outbound> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        if !session.lobby.contains(&conn) {
            return Vec::new();
        }

        if session.game.is_some() {
            info!("玩家 {} 在游戏中断开，会话重置", conn);
            self.session = None;
            return vec![Outbound::Broadcast(ServerMessage::GameReset)];
        }

        session.lobby.remove(&conn);
        info!("玩家 {} 离开大厅，剩余 {} 人", conn, session.lobby.len());
        let mut out = vec![Outbound::Broadcast(session.lobby_update())];
        if session.lobby.is_empty() {
            self.session = None;
            return out;
        }

        // 房主可能变了，重新判断是否可以开局
        session.mode_selection_open = false;
        out.extend(self.check_start());
        out
    }

    /// 执行所有在 `now` 之前到期的定时转换
    pub fn advance_to(&mut self, now: Duration) -> Vec<Outbound> {
        let mut out = Vec::new();
        loop {
            let Some(session) = self.session.as_mut() else { break };
            let Some(task) = session.scheduler.pop_due(now) else { break };
            out.extend(self.fire(task));
        }
        out
    }

    // --- 大厅 ---

    fn join(&mut self, conn: PlayerId, name: &str) -> Vec<Outbound> {
        let config = &self.config;
        let session = self.session.get_or_insert_with(|| Session::new(config));
        if session.game.is_some() {
            debug!("忽略加入请求 {}: {}", conn, LobbyError::GameInProgress);
            return Vec::new();
        }

        match session.lobby.join(conn, name) {
            Ok(entry) => {
                info!("玩家 {} ({}) 加入大厅", entry.name, conn);
                // 新人未准备，正在进行的模式选择作废
                session.mode_selection_open = false;
                vec![Outbound::Broadcast(session.lobby_update())]
            }
            Err(LobbyError::LobbyFull { max_players }) => {
                info!("大厅已满，拒绝 {}", conn);
                vec![Outbound::Direct(conn, ServerMessage::LobbyFull { max_players })]
            }
            Err(e) => {
                debug!("忽略加入请求 {}: {}", conn, e);
                Vec::new()
            }
        }
    }

    fn toggle_ready(&mut self, conn: PlayerId) -> Vec<Outbound> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        if session.game.is_some() {
            return Vec::new();
        }
        if let Err(e) = session.lobby.toggle_ready(&conn) {
            debug!("忽略准备请求: {}", e);
            return Vec::new();
        }

        let mut out = vec![Outbound::Broadcast(session.lobby_update())];
        out.extend(self.check_start());
        out
    }

    /// 所有人准备好时离开大厅：直接开经典局，或者请房主选择模式
    fn check_start(&mut self) -> Vec<Outbound> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        if !session.lobby.all_ready() {
            session.mode_selection_open = false;
            return Vec::new();
        }

        match self.config.lobby_flow {
            LobbyFlow::AutoClassic => self.start_game(GameMode::Classic),
            LobbyFlow::HostSelects => {
                if session.mode_selection_open {
                    return Vec::new();
                }
                let Some(host_id) = session.lobby.host_id() else { return Vec::new() };
                session.mode_selection_open = true;
                vec![Outbound::Broadcast(ServerMessage::ShowModeSelection { host_id })]
            }
        }
    }

    fn select_mode(&mut self, conn: PlayerId, mode: GameMode) -> Vec<Outbound> {
        let Some(session) = self.session.as_ref() else { return Vec::new() };
        if session.game.is_some() || !session.mode_selection_open || !session.lobby.all_ready() {
            return Vec::new();
        }
        if !session.lobby.is_host(&conn) {
            debug!("非房主 {} 尝试选择模式", conn);
            return Vec::new();
        }
        self.start_game(mode)
    }

    fn start_game(&mut self, mode: GameMode) -> Vec<Outbound> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };

        let mut game = GameState::new(mode, session.lobby.to_players());
        if mode == GameMode::Powers {
            game.event_deck = EventDeck::shuffled(&mut self.rng);
        }
        logic::start_new_round(&mut game, &self.config, &mut self.rng);
        info!("游戏开始：{} 名玩家，模式 {:?}", game.players.len(), mode);

        let snapshot = game.clone();
        session.game = Some(game);
        session.mode_selection_open = false;
        vec![
            Outbound::Broadcast(ServerMessage::GameStarted),
            Outbound::Broadcast(ServerMessage::GameStateUpdate(snapshot)),
        ]
    }

    /// 游戏结束后回到大厅：保留玩家，清空准备状态，对局整个丢弃
    fn play_again(&mut self, conn: PlayerId) -> Vec<Outbound> {
        let Some(session) = self.session.take() else { return Vec::new() };
        let finished = session.game.as_ref().is_some_and(|g| g.game_over);
        if !finished || !session.lobby.contains(&conn) {
            self.session = Some(session);
            return Vec::new();
        }

        let mut lobby = session.lobby;
        lobby.reset_ready();
        let fresh = Session { lobby, ..Session::new(&self.config) };
        info!("玩家 {} 发起再来一局，回到大厅", conn);
        let out = vec![
            Outbound::Broadcast(ServerMessage::BackToLobby),
            Outbound::Broadcast(fresh.lobby_update()),
        ];
        self.session = Some(fresh);
        out
    }

    // --- 对局 ---

    fn game_action(&mut self, conn: PlayerId, msg: ClientMessage, now: Duration) -> Vec<Outbound> {
        let SessionController { config, rng, session } = self;
        let Some(session) = session.as_mut() else { return Vec::new() };
        let Some(game) = session.game.as_mut() else { return Vec::new() };
        if !session.scheduler.is_idle() {
            debug!("忽略 {} 的操作: {}", conn, ActionError::BetweenRounds);
            return Vec::new();
        }

        let result = match msg {
            ClientMessage::RollDice => logic::roll_dice(game, conn, rng).map(|_| Step::Updated),
            ClientMessage::PlaceDice { face_value } => logic::place_dice(game, conn, face_value).map(Step::Turn),
            ClientMessage::ActivatePower { power } => powers::activate_power(game, conn, power).map(|o| match o {
                PowerOutcome::TurnEnded(t) => Step::Turn(t),
                PowerOutcome::BuyOffered(offers) => Step::Offer(offers),
            }),
            ClientMessage::BuyCasino { casino_id } => {
                powers::buy_casino(game, conn, casino_id).map(|(_, t)| Step::Turn(t))
            }
            ClientMessage::SetGoldenDie { face } => powers::set_golden_die(game, conn, face).map(|_| Step::Updated),
            ClientMessage::JoinLobby { .. }
            | ClientMessage::PlayerReady
            | ClientMessage::ModeSelected { .. }
            | ClientMessage::PlayAgain => return Vec::new(),
        };

        match result {
            Err(e) => {
                debug!("忽略 {} 的操作: {}", conn, e);
                Vec::new()
            }
            Ok(Step::Updated) | Ok(Step::Turn(TurnOutcome::NextPlayer(_))) => {
                vec![Outbound::Broadcast(ServerMessage::GameStateUpdate(game.clone()))]
            }
            Ok(Step::Offer(open_casinos)) => vec![
                Outbound::Broadcast(ServerMessage::GameStateUpdate(game.clone())),
                Outbound::Direct(conn, ServerMessage::ShowBuyCasinoModal { open_casinos }),
            ],
            Ok(Step::Turn(TurnOutcome::RoundEnded)) => {
                let awards = scoring::calculate_round_winners(game);
                info!("第 {} 轮结束，发出 {} 张钞票", game.round_number, awards.len());
                session.scheduler.schedule(now + config.round_summary_delay, Transition::ConcludeRound);
                vec![Outbound::Broadcast(ServerMessage::GameStateUpdate(game.clone()))]
            }
        }
    }

    fn fire(&mut self, task: ScheduledTransition) -> Vec<Outbound> {
        let SessionController { config, rng, session } = self;
        let Some(session) = session.as_mut() else { return Vec::new() };
        let Some(game) = session.game.as_mut() else { return Vec::new() };

        match task.transition {
            Transition::ConcludeRound => {
                if game.round_number >= config.total_rounds {
                    game.game_over = true;
                    let Some(winner) = scoring::final_winner(game).cloned() else { return Vec::new() };
                    info!("游戏结束，赢家 {} ({})", winner.name, winner.score);
                    vec![
                        Outbound::Broadcast(ServerMessage::GameOver { winner }),
                        Outbound::Broadcast(ServerMessage::GameStateUpdate(game.clone())),
                    ]
                } else {
                    session.scheduler.schedule(task.due + config.next_round_delay, Transition::BeginNextRound);
                    vec![Outbound::Broadcast(ServerMessage::RoundOver { round_number: game.round_number })]
                }
            }
            Transition::BeginNextRound => {
                logic::start_new_round(game, config, rng);
                info!("第 {} 轮开始", game.round_number);
                vec![Outbound::Broadcast(ServerMessage::GameStateUpdate(game.clone()))]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Die;
    use uuid::Uuid;

    const T0: Duration = Duration::ZERO;

    fn controller(flow: LobbyFlow) -> SessionController {
        let config = GameConfig { lobby_flow: flow, ..GameConfig::default() };
        SessionController::new(config, GameRng::from_seed(42))
    }

    fn messages(out: &[Outbound]) -> Vec<&ServerMessage> {
        out.iter()
            .map(|o| match o {
                Outbound::Broadcast(m) | Outbound::Direct(_, m) => m,
            })
            .collect()
    }

    fn join_all(ctl: &mut SessionController, n: usize) -> Vec<PlayerId> {
        let ids: Vec<PlayerId> = (0..n).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            ctl.handle(*id, ClientMessage::JoinLobby { name: format!("p{}", i) }, T0);
        }
        ids
    }

    fn start_classic(n: usize) -> (SessionController, Vec<PlayerId>) {
        let mut ctl = controller(LobbyFlow::AutoClassic);
        let ids = join_all(&mut ctl, n);
        for id in &ids {
            ctl.handle(*id, ClientMessage::PlayerReady, T0);
        }
        assert!(ctl.game().is_some());
        (ctl, ids)
    }

    /// 当前玩家掷骰并放下第一个点数，返回放置产生的消息
    fn play_turn(ctl: &mut SessionController, now: Duration) -> Vec<Outbound> {
        let pid = ctl.game().unwrap().current_player_id().unwrap();
        ctl.handle(pid, ClientMessage::RollDice, now);
        let face = ctl.game().unwrap().current_roll.iter().find_map(Die::face).unwrap();
        ctl.handle(pid, ClientMessage::PlaceDice { face_value: face }, now)
    }

    fn play_until_round_end(ctl: &mut SessionController, now: Duration) -> Vec<Outbound> {
        loop {
            let out = play_turn(ctl, now);
            if ctl.game().unwrap().round_over {
                return out;
            }
        }
    }

    #[test]
    fn test_auto_classic_starts_when_all_ready() {
        let mut ctl = controller(LobbyFlow::AutoClassic);
        let ids = join_all(&mut ctl, 2);
        let out = ctl.handle(ids[0], ClientMessage::PlayerReady, T0);
        assert!(ctl.game().is_none());
        assert_eq!(out.len(), 1);

        let out = ctl.handle(ids[1], ClientMessage::PlayerReady, T0);
        let msgs = messages(&out);
        assert!(msgs.iter().any(|m| matches!(m, ServerMessage::GameStarted)));
        assert!(matches!(msgs.last(), Some(ServerMessage::GameStateUpdate(g)) if g.mode == GameMode::Classic));
        assert_eq!(ctl.game().unwrap().round_number, 1);
    }

    #[test]
    fn test_host_selects_mode() {
        let mut ctl = controller(LobbyFlow::HostSelects);
        let ids = join_all(&mut ctl, 3);
        for id in &ids {
            ctl.handle(*id, ClientMessage::PlayerReady, T0);
        }
        assert!(ctl.game().is_none());

        let out = ctl.handle(ids[1], ClientMessage::ModeSelected { mode: GameMode::Powers }, T0);
        assert!(out.is_empty(), "只有房主可以选择模式");
        assert!(ctl.game().is_none());

        ctl.handle(ids[0], ClientMessage::ModeSelected { mode: GameMode::Powers }, T0);
        let game = ctl.game().unwrap();
        assert_eq!(game.mode, GameMode::Powers);
        assert_eq!(game.event_deck.len(), 14);
    }

    #[test]
    fn test_mode_selection_shown_to_host() {
        let mut ctl = controller(LobbyFlow::HostSelects);
        let ids = join_all(&mut ctl, 2);
        ctl.handle(ids[0], ClientMessage::PlayerReady, T0);
        let out = ctl.handle(ids[1], ClientMessage::PlayerReady, T0);
        assert!(messages(&out)
            .iter()
            .any(|m| matches!(m, ServerMessage::ShowModeSelection { host_id } if *host_id == ids[0])));
    }

    #[test]
    fn test_lobby_full_notice_goes_to_joiner_only() {
        let mut ctl = controller(LobbyFlow::AutoClassic);
        join_all(&mut ctl, 5);
        let late = Uuid::new_v4();
        let out = ctl.handle(late, ClientMessage::JoinLobby { name: "late".into() }, T0);
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Outbound::Direct(id, ServerMessage::LobbyFull { max_players: 5 }) if *id == late));
        assert_eq!(ctl.lobby().unwrap().len(), 5);
    }

    #[test]
    fn test_join_during_game_is_ignored() {
        let (mut ctl, _) = start_classic(2);
        let out = ctl.handle(Uuid::new_v4(), ClientMessage::JoinLobby { name: "late".into() }, T0);
        assert!(out.is_empty());
        assert_eq!(ctl.lobby().unwrap().len(), 2);
    }

    #[test]
    fn test_out_of_turn_intents_are_silent() {
        let (mut ctl, ids) = start_classic(2);
        assert!(ctl.handle(ids[1], ClientMessage::RollDice, T0).is_empty());
        assert!(ctl.handle(ids[0], ClientMessage::PlaceDice { face_value: 3 }, T0).is_empty());
        assert!(!ctl.game().unwrap().has_roll());
        assert_eq!(ctl.handle(ids[0], ClientMessage::RollDice, T0).len(), 1);
    }

    #[test]
    fn test_round_end_sequence_is_time_gated() {
        let (mut ctl, ids) = start_classic(2);
        let t = Duration::from_secs(10);
        let out = play_until_round_end(&mut ctl, t);
        assert!(matches!(messages(&out).as_slice(), [ServerMessage::GameStateUpdate(g)] if g.round_over));
        assert_eq!(ctl.next_deadline(), Some(t + Duration::from_millis(4000)));

        // 暂停期间没有人能行动
        for id in &ids {
            assert!(ctl.handle(*id, ClientMessage::RollDice, t).is_empty());
        }

        assert!(ctl.advance_to(t + Duration::from_millis(3999)).is_empty());
        let out = ctl.advance_to(t + Duration::from_millis(4000));
        assert!(matches!(messages(&out).as_slice(), [ServerMessage::RoundOver { round_number: 1 }]));

        assert!(ctl.advance_to(t + Duration::from_millis(5999)).is_empty());
        let out = ctl.advance_to(t + Duration::from_millis(6000));
        assert!(matches!(messages(&out).as_slice(), [ServerMessage::GameStateUpdate(g)] if g.round_number == 2 && !g.round_over));
        assert!(ctl.next_deadline().is_none());
    }

    #[test]
    fn test_full_game_ends_with_top_scorer() {
        let (mut ctl, _) = start_classic(3);
        let mut now = Duration::ZERO;
        let mut game_over = Vec::new();

        while game_over.is_empty() {
            play_until_round_end(&mut ctl, now);
            // 一次快进跑完所有到期的转换
            now += Duration::from_secs(60);
            let out = ctl.advance_to(now);
            game_over = messages(&out)
                .into_iter()
                .filter_map(|m| match m {
                    ServerMessage::GameOver { winner } => Some(winner.clone()),
                    _ => None,
                })
                .collect();
        }

        let game = ctl.game().unwrap();
        assert!(game.game_over);
        assert_eq!(game.round_number, 4);
        let best = game.players.iter().map(|p| p.score).max().unwrap();
        let expected = game.players.iter().find(|p| p.score == best).unwrap();
        assert_eq!(game_over[0].id, expected.id);
    }

    #[test]
    fn test_play_again_returns_to_lobby() {
        let (mut ctl, ids) = start_classic(2);
        assert!(ctl.handle(ids[0], ClientMessage::PlayAgain, T0).is_empty(), "游戏未结束");

        let mut now = Duration::ZERO;
        while !ctl.game().unwrap().game_over {
            play_until_round_end(&mut ctl, now);
            now += Duration::from_secs(60);
            ctl.advance_to(now);
        }

        let out = ctl.handle(ids[1], ClientMessage::PlayAgain, now);
        assert!(matches!(messages(&out)[0], ServerMessage::BackToLobby));
        assert!(ctl.game().is_none());
        let lobby = ctl.lobby().unwrap();
        assert_eq!(lobby.len(), 2);
        assert!(lobby.entries().iter().all(|e| !e.ready));
        assert_eq!(lobby.host_id(), Some(ids[0]));
    }

    #[test]
    fn test_disconnect_mid_round_resets_session() {
        let (mut ctl, ids) = start_classic(3);
        play_turn(&mut ctl, T0);
        let out = ctl.disconnect(ids[2]);
        assert!(matches!(messages(&out).as_slice(), [ServerMessage::GameReset]));
        assert!(ctl.game().is_none());
        assert!(ctl.lobby().is_none());

        // 重置后可以重新组局
        let out = ctl.handle(ids[0], ClientMessage::JoinLobby { name: "again".into() }, T0);
        assert_eq!(out.len(), 1);
        assert_eq!(ctl.lobby().unwrap().host_id(), Some(ids[0]));
    }

    #[test]
    fn test_reset_drops_pending_transitions() {
        let (mut ctl, ids) = start_classic(2);
        play_until_round_end(&mut ctl, T0);
        assert!(ctl.next_deadline().is_some());

        ctl.disconnect(ids[0]);
        assert!(ctl.next_deadline().is_none());
        assert!(ctl.advance_to(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn test_pre_game_disconnect_moves_host() {
        let mut ctl = controller(LobbyFlow::HostSelects);
        let ids = join_all(&mut ctl, 3);
        for id in &ids {
            ctl.handle(*id, ClientMessage::PlayerReady, T0);
        }

        let out = ctl.disconnect(ids[0]);
        let msgs = messages(&out);
        assert!(matches!(msgs[0], ServerMessage::LobbyUpdate { host_id: Some(h), .. } if *h == ids[1]));
        // 剩下的人仍然都已准备，模式选择交给新房主
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::ShowModeSelection { host_id } if *host_id == ids[1])));
        assert!(ctl.handle(ids[0], ClientMessage::ModeSelected { mode: GameMode::Classic }, T0).is_empty());
        ctl.handle(ids[1], ClientMessage::ModeSelected { mode: GameMode::Classic }, T0);
        assert!(ctl.game().is_some());
    }

    #[test]
    fn test_buy_casino_modal_is_direct() {
        let mut ctl = controller(LobbyFlow::HostSelects);
        let ids = join_all(&mut ctl, 2);
        for id in &ids {
            ctl.handle(*id, ClientMessage::PlayerReady, T0);
        }
        ctl.handle(ids[0], ClientMessage::ModeSelected { mode: GameMode::Powers }, T0);

        ctl.handle(ids[0], ClientMessage::RollDice, T0);
        // 固定一个满足 Buy Casino 的掷骰结果
        if let Some(game) = ctl.session.as_mut().and_then(|s| s.game.as_mut()) {
            game.current_roll = vec![Die::Face(6); 6];
        }
        let out = ctl.handle(ids[0], ClientMessage::from(crate::state::PowerKind::BuyCasino), T0);
        assert!(out.iter().any(|o| matches!(o, Outbound::Direct(id, ServerMessage::ShowBuyCasinoModal { .. }) if *id == ids[0])));

        let offered = ctl.game().unwrap().casinos.iter().find(|c| !c.money.is_empty()).unwrap();
        let (casino_id, top) = (offered.id, offered.money[0]);
        ctl.handle(ids[0], ClientMessage::BuyCasino { casino_id }, T0);
        let game = ctl.game().unwrap();
        assert_eq!(game.players[0].score, top);
        assert_eq!(game.current_player_id(), Some(ids[1]));
    }
}
