mod config;

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use dashmap::DashMap;
use futures_util::{stream::StreamExt, SinkExt};
use tokio::sync::{mpsc, mpsc::error::TrySendError, Mutex, Notify};
use tokio::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::ServerConfig;
use vegas_dice_core::{ClientMessage, GameRng, Outbound, PlayerId, ServerMessage, SessionController};

// 服务器全局状态
// 所有对游戏状态的修改都在 controller 这把锁内完成，并且在锁内投递消息，
// 保证每个客户端看到的消息顺序与状态变化顺序一致。
struct AppState {
    controller: Mutex<SessionController>,
    // 将连接ID映射到该连接的发送通道
    connections: DashMap<PlayerId, mpsc::Sender<ServerMessage>>,
    // 会话时钟的起点
    started_at: Instant,
    // 有新的定时转换被安排时唤醒定时任务
    timer_wakeup: Notify,
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().inspect_err(|e| error!("配置错误: {}", e))?;
    let rng = match config.seed {
        Some(seed) => {
            info!("使用固定随机种子 {}", seed);
            GameRng::from_seed(seed)
        }
        None => GameRng::from_entropy(),
    };

    let state = SharedState::new(AppState {
        controller: Mutex::new(SessionController::new(config.game.clone(), rng)),
        connections: DashMap::new(),
        started_at: Instant::now(),
        timer_wakeup: Notify::new(),
    });

    tokio::spawn(run_timers(state.clone()));

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    info!("服务器正在监听 {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = Uuid::new_v4();

    // 创建一个 MPSC 通道，用于从其他任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(p) => p,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    info!("新连接 {}", conn_id);
    let _ = tx.send(ServerMessage::Connected { your_id: conn_id }).await;
    {
        let mut controller = state.controller.lock().await;
        state.connections.insert(conn_id, tx);
        let out = controller.connect(conn_id);
        dispatch(&state, out);
    }

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    let mut controller = state.controller.lock().await;
                    let out = controller.handle(conn_id, client_msg, state.started_at.elapsed());
                    dispatch(&state, out);
                    state.timer_wakeup.notify_one();
                }
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                }
            }
        }
    }

    // 客户端断开连接，执行清理工作
    {
        let mut controller = state.controller.lock().await;
        state.connections.remove(&conn_id);
        let out = controller.disconnect(conn_id);
        dispatch(&state, out);
        state.timer_wakeup.notify_one();
    }
    info!("连接 {} 关闭", conn_id);
}

/// 定时任务：等到最早的转换到期后推进会话。
///
/// 有新的转换被安排时会被唤醒并重新计算等待时间。
async fn run_timers(state: SharedState) {
    loop {
        let deadline = state.controller.lock().await.next_deadline();
        match deadline {
            Some(due) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(state.started_at + due) => {}
                    _ = state.timer_wakeup.notified() => continue,
                }
            }
            None => {
                state.timer_wakeup.notified().await;
                continue;
            }
        }

        let mut controller = state.controller.lock().await;
        let out = controller.advance_to(state.started_at.elapsed());
        dispatch(&state, out);
    }
}

/// 把控制器产生的消息投递到对应的连接
///
/// 在控制器锁内调用，所以只做非阻塞投递，不读消息的客户端拖不住其他人。
fn dispatch(state: &AppState, outbound: Vec<Outbound>) {
    for item in outbound {
        match item {
            Outbound::Broadcast(msg) => {
                for entry in state.connections.iter() {
                    deliver(*entry.key(), entry.value(), msg.clone());
                }
            }
            Outbound::Direct(conn_id, msg) => {
                if let Some(entry) = state.connections.get(&conn_id) {
                    deliver(conn_id, entry.value(), msg);
                }
            }
        }
    }
}

/// 投递一条消息；缓冲区满或连接已关闭时丢弃并返回 false。
/// 每次状态变化都会广播完整快照，丢掉的消息会被后面的快照补上。
fn deliver(conn_id: PlayerId, sender: &mpsc::Sender<ServerMessage>, msg: ServerMessage) -> bool {
    match sender.try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("连接 {} 的发送缓冲区已满，丢弃一条消息", conn_id);
            false
        }
        Err(TrySendError::Closed(_)) => {
            // 该玩家也断开了，后续由其自己的 handle_socket 任务处理
            warn!("向连接 {} 发送消息失败（可能已断开）", conn_id);
            false
        }
    }
}
