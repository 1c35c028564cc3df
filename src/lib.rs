//! Опрос устройств по SNMP с подбором размера запроса, кэшем отсутствующих
//! OID, расписанием чтения групп и масштабированием значений. Результат
//! отдаётся пакетом measurement'ов для InfluxDB.

pub mod collector;
pub mod config;
pub mod context;
pub mod error;
pub mod formatter;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod scaling;
pub mod snmp;

pub use collector::{PollOutput, PollerNode};
pub use error::PollError;
