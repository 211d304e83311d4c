use crate::error::LobbyError;
use crate::state::{Player, PlayerId, PLAYER_COLORS};
use serde::{Deserialize, Serialize};

const MAX_NAME_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyEntry {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
}

/// lobbyUpdate 中每位玩家的展示信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub ready: bool,
    pub is_host: bool,
}

/// 开局前的大厅：按加入顺序记录玩家和准备状态
#[derive(Debug, Clone)]
pub struct Lobby {
    entries: Vec<LobbyEntry>,
    host_id: Option<PlayerId>,
    max_players: usize,
    min_players: usize,
}

impl Lobby {
    pub fn new(max_players: usize, min_players: usize) -> Self {
        Lobby { entries: Vec::new(), host_id: None, max_players, min_players }
    }

    pub fn join(&mut self, id: PlayerId, name: &str) -> Result<LobbyEntry, LobbyError> {
        if self.contains(&id) {
            return Err(LobbyError::AlreadyJoined(id));
        }
        if self.entries.len() >= self.max_players {
            return Err(LobbyError::LobbyFull { max_players: self.max_players });
        }

        let entry = LobbyEntry {
            id,
            name: Self::clean_name(name, self.entries.len() + 1),
            ready: false,
        };
        self.entries.push(entry.clone());
        // 第一个加入的人成为房主
        if self.host_id.is_none() {
            self.host_id = Some(id);
        }
        Ok(entry)
    }

    fn clean_name(name: &str, position: usize) -> String {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            format!("Player {}", position)
        } else {
            trimmed.chars().take(MAX_NAME_LEN).collect()
        }
    }

    /// 切换准备状态，返回切换后的状态
    pub fn toggle_ready(&mut self, id: &PlayerId) -> Result<bool, LobbyError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == *id)
            .ok_or(LobbyError::NotInLobby(*id))?;
        entry.ready = !entry.ready;
        Ok(entry.ready)
    }

    pub fn all_ready(&self) -> bool {
        self.entries.len() >= self.min_players && self.entries.iter().all(|e| e.ready)
    }

    /// 开局前断线：移除玩家，如有必要把房主交给最早加入的剩余玩家
    pub fn remove(&mut self, id: &PlayerId) -> Option<LobbyEntry> {
        let pos = self.entries.iter().position(|e| e.id == *id)?;
        let removed = self.entries.remove(pos);
        if self.host_id == Some(removed.id) {
            self.host_id = self.entries.first().map(|e| e.id);
        }
        Some(removed)
    }

    pub fn reset_ready(&mut self) {
        self.entries.iter_mut().for_each(|e| e.ready = false);
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.entries.iter().any(|e| e.id == *id)
    }

    pub fn host_id(&self) -> Option<PlayerId> {
        self.host_id
    }

    pub fn is_host(&self, id: &PlayerId) -> bool {
        self.host_id == Some(*id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LobbyEntry] {
        &self.entries
    }

    pub fn snapshot(&self) -> Vec<LobbyPlayer> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| LobbyPlayer {
                id: e.id,
                name: e.name.clone(),
                color: PLAYER_COLORS[i % PLAYER_COLORS.len()].to_string(),
                ready: e.ready,
                is_host: self.is_host(&e.id),
            })
            .collect()
    }

    /// 按加入顺序生成对局玩家，颜色随之确定
    pub fn to_players(&self) -> Vec<Player> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| Player::new(e.id, e.name.clone(), i))
            .collect()
    }
}
