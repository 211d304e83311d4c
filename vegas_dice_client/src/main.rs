use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use vegas_dice_core::{ClientMessage, GameMode, PowerKind, ServerMessage};

const DEFAULT_URL: &str = "ws://127.0.0.1:25917/ws";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(&std::env::var("VEGAS_SERVER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()))?;

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的消息
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(server_msg) => {
                            // 简单地将收到的消息打印到控制台
                            println!("\n<-- [服务器消息]:\n{:#?}\n", server_msg);
                            print!("> "); // 重新显示输入提示符
                            let _ = std::io::stdout().flush();
                        }
                        Err(e) => eprintln!("解析服务器消息失败: {}", e),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 拉斯维加斯骰子客户端 ---");
    println!("可用命令:");
    println!("  join <昵称>               - 加入大厅");
    println!("  ready                     - 切换准备状态");
    println!("  mode <classic|powers>     - 选择模式 (仅房主)");
    println!("  roll                      - 掷骰");
    println!("  place <点数>              - 把该点数的骰子放到对应赌场");
    println!("  power <能力>              - director / shiftBet / diceHeist / buyCasino");
    println!("  buy <赌场编号>            - 买下赌场");
    println!("  golden <点数>             - 给金骰子指定点数");
    println!("  again                     - 再来一局");
    println!("  exit                      - 退出");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = stdin.next_line().await? else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let command = parts.first().copied();

        let client_msg = match command {
            Some("join") => {
                let name = parts[1..].join(" ");
                ClientMessage::JoinLobby { name }
            }
            Some("ready") => ClientMessage::PlayerReady,
            Some("mode") => match parts.get(1).map(|s| s.parse::<GameMode>()) {
                Some(Ok(mode)) => ClientMessage::ModeSelected { mode },
                _ => {
                    println!("用法: mode <classic|powers>");
                    continue;
                }
            },
            Some("roll") => ClientMessage::RollDice,
            Some("place") => match parse_number(&parts) {
                Some(face_value) => ClientMessage::PlaceDice { face_value },
                None => {
                    println!("用法: place <点数>");
                    continue;
                }
            },
            Some("power") => match parts.get(1).map(|s| s.parse::<PowerKind>()) {
                Some(Ok(power)) => ClientMessage::from(power),
                _ => {
                    println!("用法: power <director|shiftBet|diceHeist|buyCasino>");
                    continue;
                }
            },
            Some("buy") => match parse_number(&parts) {
                Some(casino_id) => ClientMessage::BuyCasino { casino_id },
                None => {
                    println!("用法: buy <赌场编号>");
                    continue;
                }
            },
            Some("golden") => match parse_number(&parts) {
                Some(face) => ClientMessage::SetGoldenDie { face },
                None => {
                    println!("用法: golden <点数>");
                    continue;
                }
            },
            Some("again") => ClientMessage::PlayAgain,
            Some("exit") => {
                println!("正在断开连接...");
                break;
            }
            None => continue,
            _ => {
                println!("未知命令: {}", line);
                continue;
            }
        };

        let payload = serde_json::to_string(&client_msg)?;
        write.send(Message::Text(payload.into())).await?;
    }

    Ok(())
}

fn parse_number(parts: &[&str]) -> Option<u8> {
    parts.get(1).and_then(|s| s.parse().ok())
}
