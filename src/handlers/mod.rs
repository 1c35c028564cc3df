use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::collector::PollerNode;

pub mod health;
pub mod poll;

pub use health::health;
pub use poll::handle_poll;

/// Узлы опроса по имени; мьютекс не даёт циклам одного узла пересекаться
pub type NodeMap = BTreeMap<String, Arc<Mutex<PollerNode>>>;

#[derive(Clone)]
pub struct AppState {
    pub nodes: Arc<NodeMap>,
}
