use async_trait::async_trait;
use snmp2::{AsyncSession, Oid, Pdu, Value};
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::{SessionError, SessionTarget, SnmpSession, SnmpVersion, Varbind, VarbindValue, parse_oid};

const ERRSTATUS_NOERROR: u32 = 0;
const ERRSTATUS_TOOBIG: u32 = 1;
const ERRSTATUS_NOSUCHNAME: u32 = 2;

/// SNMPv1/v2c сессия на базе snmp2.
///
/// Запросы к одному агенту идут строго по очереди через мьютекс,
/// иначе ответы могут перепутаться. После таймаута, сбоя транспорта или
/// прерванного запроса сокет пересоздаётся: snmp2 не сдвигает request id,
/// если future запроса был отменён, и поздний ответ достался бы следующему запросу.
pub struct Snmp2Session {
    target: SessionTarget,
    inner: Mutex<Inner>,
}

struct Inner {
    session: AsyncSession,
    /// Запрос начат и не завершён (future отменили снаружи)
    in_flight: bool,
}

impl Snmp2Session {
    pub async fn connect(target: &SessionTarget) -> Result<Self, SessionError> {
        let session = Self::open(target).await?;
        tracing::debug!(address = %target.address(), version = %target.version, "SNMP сессия создана");

        Ok(Self {
            target: target.clone(),
            inner: Mutex::new(Inner {
                session,
                in_flight: false,
            }),
        })
    }

    async fn open(target: &SessionTarget) -> Result<AsyncSession, SessionError> {
        let address = target.address();
        let community = target.community.as_bytes();

        match target.version {
            SnmpVersion::V1 => AsyncSession::new_v1(address.as_str(), community, 0).await,
            SnmpVersion::V2c => AsyncSession::new_v2c(address.as_str(), community, 0).await,
        }
        .map_err(|e| {
            SessionError::Transport(format!("Не удалось создать SNMP сессию {}: {}", address, e))
        })
    }

    async fn reopen(&self, inner: &mut Inner) {
        match Self::open(&self.target).await {
            Ok(session) => {
                inner.session = session;
                inner.in_flight = false;
                tracing::debug!(address = %self.target.address(), "SNMP сессия пересоздана");
            }
            Err(e) => {
                // флаг остаётся, следующий запрос попробует ещё раз
                tracing::warn!(address = %self.target.address(), error = %e, "Не удалось пересоздать SNMP сессию");
            }
        }
    }
}

#[async_trait]
impl SnmpSession for Snmp2Session {
    async fn get(&self, oids: &[String]) -> Result<Vec<Varbind>, SessionError> {
        let parsed = oids
            .iter()
            .map(|s| parse_oid(s))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&Oid<'_>> = parsed.iter().collect();

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.in_flight {
            tracing::warn!(address = %self.target.address(), "Предыдущий запрос прерван, пересоздаём сессию");
            self.reopen(inner).await;
            if inner.in_flight {
                return Err(SessionError::Transport(format!(
                    "SNMP сессия {} недоступна после прерванного запроса",
                    self.target.address()
                )));
            }
        }

        inner.in_flight = true;
        let result = match timeout(self.target.timeout, inner.session.get_many(&refs)).await {
            Ok(Ok(resp)) => response_varbinds(oids, resp),
            Ok(Err(e)) => Err(SessionError::Transport(format!(
                "SNMP GET запрос к {} не удался: {}",
                self.target.address(),
                e
            ))),
            Err(_) => Err(SessionError::Timeout(self.target.timeout)),
        };

        match &result {
            Err(SessionError::Timeout(_)) | Err(SessionError::Transport(_)) => self.reopen(inner).await,
            _ => inner.in_flight = false,
        }
        result
    }
}

/// Разбирает статус ответа и забирает varbind'ы в собственные типы
fn response_varbinds(oids: &[String], resp: Pdu<'_>) -> Result<Vec<Varbind>, SessionError> {
    match resp.error_status {
        ERRSTATUS_NOERROR => {}
        ERRSTATUS_TOOBIG => return Err(SessionError::TooBig),
        ERRSTATUS_NOSUCHNAME => {
            // error_index считается с 1
            let oid = (resp.error_index as usize)
                .checked_sub(1)
                .and_then(|i| oids.get(i))
                .cloned();
            return Err(SessionError::NoSuchName { oid });
        }
        status => {
            return Err(SessionError::Status {
                status,
                index: resp.error_index,
            });
        }
    }

    Ok(resp
        .varbinds
        .into_iter()
        .map(|(oid, value)| Varbind {
            oid: oid.to_string(),
            value: convert_value(value),
        })
        .collect())
}

/// Переводит значение snmp2 в собственный тип, не привязанный к буферу ответа
fn convert_value(value: Value<'_>) -> VarbindValue {
    match value {
        Value::Boolean(b) => VarbindValue::Boolean(b),
        Value::Integer(i) => VarbindValue::Integer(i),
        Value::OctetString(bytes) => VarbindValue::OctetString(bytes.to_vec()),
        Value::ObjectIdentifier(oid) => VarbindValue::ObjectIdentifier(oid.to_string()),
        Value::IpAddress(ip) => VarbindValue::IpAddress(ip),
        Value::Counter32(v) => VarbindValue::Counter32(v),
        Value::Unsigned32(v) => VarbindValue::Unsigned32(v),
        Value::Timeticks(v) => VarbindValue::TimeTicks(v),
        Value::Opaque(bytes) => VarbindValue::Opaque(bytes.to_vec()),
        // snmp2 уже собрал u64, отдаём буфер, как его отдаёт агент
        Value::Counter64(v) => VarbindValue::Counter64(v.to_be_bytes().to_vec()),
        Value::NoSuchObject => VarbindValue::NoSuchObject,
        Value::NoSuchInstance => VarbindValue::NoSuchInstance,
        Value::EndOfMibView => VarbindValue::EndOfMibView,
        _ => VarbindValue::Null,
    }
}
