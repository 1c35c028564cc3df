use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::error::PollError;
use crate::models::InboundMessage;

/// Верхняя граница на ручной цикл опроса (с учётом подбора блока и поштучных запросов)
const POLL_TIMEOUT_SECS: u64 = 120;

/// Ручной цикл опроса узла с входящим сообщением в теле запроса
pub async fn handle_poll(
    State(state): State<AppState>,
    Path(node_name): Path<String>,
    Json(msg): Json<InboundMessage>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let node = state
        .nodes
        .get(&node_name)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Узел '{}' не найден", node_name)))?;

    // цикл идёт отдельной задачей: таймаут ответа не обрывает его на середине,
    // кэш и расписание сохраняются, сессия остаётся согласованной
    let work = tokio::spawn(async move {
        let mut node = node.lock().await;
        node.poll(&msg).await
    });

    let output = match timeout(Duration::from_secs(POLL_TIMEOUT_SECS), work).await {
        Ok(Ok(Ok(output))) => output,
        Ok(Ok(Err(e))) => {
            tracing::error!(node = %node_name, error = %e, "Ручной опрос не удался");
            return Err((poll_error_status(&e), e.to_string()));
        }
        Ok(Err(e)) => {
            tracing::error!(node = %node_name, error = %e, "Задача опроса завершилась аварийно");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
        Err(_) => {
            tracing::warn!(node = %node_name, "Ответ не дождался цикла, опрос продолжается в фоне");
            return Err((
                StatusCode::GATEWAY_TIMEOUT,
                "SNMP poll timeout".to_string(),
            ));
        }
    };

    match output {
        Some(output) => Ok(Json(output).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

fn poll_error_status(e: &PollError) -> StatusCode {
    match e {
        PollError::Config(_) => StatusCode::BAD_REQUEST,
        PollError::ProtocolFatal { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
