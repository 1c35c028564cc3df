use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tracing_subscriber::EnvFilter;

use gapit_snmp::collector::PollerNode;
use gapit_snmp::config::AppConfig;
use gapit_snmp::context::FileContextStore;
use gapit_snmp::formatter::JsonFormatter;
use gapit_snmp::handlers::{AppState, NodeMap};
use gapit_snmp::models::InboundMessage;
use gapit_snmp::routes::create_router;
use gapit_snmp::snmp::SessionPool;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gapit_snmp=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GAPIT_CONFIG").ok())
        .unwrap_or_else(|| "./config/poller.yaml".to_string());

    let config = AppConfig::load(&config_path)?;
    config.debug_config();

    // Одна сессия на агент для всех узлов
    let sessions = Arc::new(SessionPool::new());
    let defaults = config.connection_defaults();
    let state_dir = config.get_state_dir();

    let mut nodes = NodeMap::new();
    for node_settings in &config.nodes {
        let gapit_code = AppConfig::node_gapit_code(node_settings)?;
        let store = Arc::new(FileContextStore::new(&state_dir, &node_settings.name)?);
        let node = PollerNode::new(
            node_settings.clone(),
            defaults.clone(),
            gapit_code,
            sessions.clone(),
            store,
        );
        if nodes
            .insert(node_settings.name.clone(), Arc::new(Mutex::new(node)))
            .is_some()
        {
            anyhow::bail!("Имя узла '{}' встречается дважды", node_settings.name);
        }
    }

    let nodes = Arc::new(nodes);
    for (name, node) in nodes.iter() {
        tokio::spawn(run_node(name.clone(), Arc::clone(node)));
    }

    let listen = config.get_listen();
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .context(format!("Не удалось открыть порт {}", listen))?;
    tracing::info!(listen = %listen, "HTTP сервер запущен");

    axum::serve(listener, create_router(AppState { nodes }))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Остановка");
        })
        .await?;

    Ok(())
}

/// Периодический опрос одного узла; пакет measurement'ов печатается строкой JSON
async fn run_node(name: String, node: Arc<Mutex<PollerNode>>) {
    let period = node.lock().await.interval();
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let msg = InboundMessage::default();

    loop {
        tick.tick().await;
        let mut node = node.lock().await;

        match node.poll(&msg).await {
            Ok(Some(output)) => {
                tracing::debug!(node = %name, summary = ?JsonFormatter::summary(&output), "Результат цикла");
                match JsonFormatter::payload_compact(&output) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::error!(node = %name, error = %e, "Ошибка JSON сериализации"),
                }
            }
            Ok(None) => {}
            Err(e) => tracing::error!(node = %name, error = %e, "Цикл опроса не удался"),
        }
    }
}
