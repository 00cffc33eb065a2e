//! Orquesta 控制台 REPL
//!
//! 入口：初始化日志、装配引擎，然后在标准输入上跑一个简单的对话循环。
//! 每行输入作为同一会话的一条消息；`/new <id>` 切换会话，`/exit` 退出。

use anyhow::Context;
use orquesta::config::{load_config, AppConfig};
use orquesta::runtime::create_engine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orquesta::observability::init();

    let cfg = load_config(None).unwrap_or_else(|_| AppConfig::default());
    let engine = create_engine(&cfg)
        .await
        .context("Failed to assemble engine")?;

    let mut conversation_id = "console".to_string();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Orquesta listo. /new <id> cambia de conversacion, /exit sale.\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        if text == "/exit" {
            break;
        }
        if let Some(id) = text.strip_prefix("/new ") {
            conversation_id = id.trim().to_string();
            stdout
                .write_all(format!("(conversación: {})\n> ", conversation_id).as_bytes())
                .await?;
            stdout.flush().await?;
            continue;
        }

        match engine.process_turn(&conversation_id, text).await {
            Ok(reply) => {
                let mut out = reply.response_text;
                if reply.requires_human {
                    out.push_str("\n[derivado a humano]");
                } else if reply.is_complete {
                    out.push_str("\n[conversación completada]");
                }
                stdout.write_all(format!("{}\n> ", out).as_bytes()).await?;
            }
            Err(e) => {
                stdout
                    .write_all(format!("error: {}\n> ", e).as_bytes())
                    .await?;
            }
        }
        stdout.flush().await?;
    }

    Ok(())
}
