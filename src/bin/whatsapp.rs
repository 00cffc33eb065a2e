//! Orquesta WhatsApp 服务
//!
//! 通过 WhatsApp Cloud API 与编排引擎对话。
//!
//! 环境变量:
//! - WHATSAPP_ACCESS_TOKEN: Meta WhatsApp API 访问令牌
//! - WHATSAPP_PHONE_NUMBER_ID: 企业电话号码 ID
//! - WHATSAPP_VERIFY_TOKEN: Webhook 验证令牌 (默认 "orquesta")
//! - OPENAI_API_KEY: 外部语义分类器的 LLM API Key（可选，缺省走 Mock）
//!
//! 启动: cargo run --bin orquesta-whatsapp --features whatsapp

#[cfg(feature = "whatsapp")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context;
    use orquesta::config::{load_config, AppConfig};
    use orquesta::integrations::whatsapp::{create_router, WhatsappState};
    use orquesta::runtime::create_engine;

    orquesta::observability::init();

    let access_token =
        std::env::var("WHATSAPP_ACCESS_TOKEN").context("WHATSAPP_ACCESS_TOKEN must be set")?;
    let phone_number_id =
        std::env::var("WHATSAPP_PHONE_NUMBER_ID").context("WHATSAPP_PHONE_NUMBER_ID must be set")?;

    let cfg = load_config(None).unwrap_or_else(|_| AppConfig::default());
    let engine = create_engine(&cfg)
        .await
        .context("Failed to assemble engine")?;

    let state = Arc::new(WhatsappState {
        engine: Arc::new(engine),
        access_token,
        phone_number_id,
    });

    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Orquesta WhatsApp server listening on http://{}", addr);
    tracing::info!("Webhook URL: http://YOUR_HOST:3000/webhook");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "whatsapp"))]
fn main() {
    eprintln!("请使用 --features whatsapp 编译: cargo run --bin orquesta-whatsapp --features whatsapp");
    std::process::exit(1);
}
