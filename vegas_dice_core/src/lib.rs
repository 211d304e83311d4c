//! # 拉斯维加斯骰子游戏核心逻辑库
//!
//! 这个 `core` crate 包含了游戏的所有状态管理、回合与结算逻辑、
//! 事件牌与能力系统、大厅与会话控制，以及客户端-服务器通信消息的定义。
//! 它不依赖具体的网络实现，服务器只需要把连接事件交给 `SessionController`，
//! 再把返回的消息投递出去。

mod config;
mod error;
mod events;
mod lobby;
mod logic;
mod message;
mod powers;
mod rng;
mod scheduler;
mod scoring;
mod session;
mod state;

pub use config::*;

pub use error::*;

pub use events::{draw_event, EventDeck};

pub use lobby::*;

pub use logic::*;

pub use message::*;

pub use powers::*;

pub use rng::GameRng;

pub use scheduler::*;

pub use scoring::*;

pub use session::*;

pub use state::*;
