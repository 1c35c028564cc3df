use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use gapit_snmp::snmp::{
    SessionError, SessionPool, SessionProvider, SessionTarget, SnmpSession, SnmpVersion,
    VarbindValue,
};

/// Превращает GetRequest в Response с теми же request id и varbind'ами (значения Null)
fn as_response(request: &[u8]) -> Vec<u8> {
    fn header(buf: &[u8], pos: usize) -> (usize, usize) {
        let len = buf[pos + 1];
        if len < 0x80 {
            return (pos + 2, len as usize);
        }
        let n = (len & 0x7f) as usize;
        let value = buf[pos + 2..pos + 2 + n]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (pos + 2 + n, value)
    }

    let mut out = request.to_vec();
    let (mut pos, _) = header(&out, 0);
    // version, community
    for _ in 0..2 {
        let (start, len) = header(&out, pos);
        pos = start + len;
    }
    assert_eq!(out[pos], 0xa0, "ожидался GetRequest");
    out[pos] = 0xa2;
    out
}

/// UDP агент: отвечает по очереди, первый ответ задерживает на `first_delay`
async fn echo_agent(first_delay: Duration) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 65535];
        let mut first = true;
        while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
            if first {
                tokio::time::sleep(first_delay).await;
                first = false;
            }
            let _ = socket.send_to(&as_response(&buf[..n]), peer).await;
        }
    });
    addr
}

fn target(addr: SocketAddr, timeout: Duration) -> SessionTarget {
    SessionTarget {
        host: addr.to_string(),
        community: "public".to_string(),
        version: SnmpVersion::V2c,
        timeout,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn pooled_session_runs_inside_worker_task() {
    // агент молчит: сокет открыт, но никто не читает
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = target(silent.local_addr().unwrap(), Duration::from_millis(200));

    let handle = tokio::spawn(async move {
        let pool = SessionPool::new();
        let session = pool.session(&target).await?;
        session.get(&["1.3.6.1.2.1.1.3.0".to_string()]).await
    });

    let result = handle.await.unwrap();
    assert_eq!(result, Err(SessionError::Timeout(Duration::from_millis(200))));
    drop(silent);
}

#[tokio::test]
async fn get_returns_requested_oids() {
    let addr = echo_agent(Duration::ZERO).await;
    let pool = SessionPool::new();
    let session = pool.session(&target(addr, Duration::from_secs(2))).await.unwrap();

    let oids = vec!["1.3.6.1.2.1.1.3.0".to_string(), "1.3.6.1.2.1.1.5.0".to_string()];
    let varbinds = session.get(&oids).await.unwrap();
    let got: Vec<&str> = varbinds.iter().map(|v| v.oid.as_str()).collect();
    assert_eq!(got, vec!["1.3.6.1.2.1.1.3.0", "1.3.6.1.2.1.1.5.0"]);
    assert!(varbinds.iter().all(|v| v.value == VarbindValue::Null));
}

#[tokio::test]
async fn late_reply_is_not_taken_for_next_request() {
    let addr = echo_agent(Duration::from_millis(700)).await;
    let pool = SessionPool::new();
    let session = pool
        .session(&target(addr, Duration::from_millis(500)))
        .await
        .unwrap();

    let first = session.get(&["1.3.6.1.2.1.1.1.0".to_string()]).await;
    assert_eq!(first, Err(SessionError::Timeout(Duration::from_millis(500))));

    let second = session.get(&["1.3.6.1.2.1.1.5.0".to_string()]).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].oid, "1.3.6.1.2.1.1.5.0");
}

#[tokio::test]
async fn evicted_session_is_recreated() {
    let addr = echo_agent(Duration::ZERO).await;
    let pool = SessionPool::new();
    let target = target(addr, Duration::from_secs(2));

    let a = pool.session(&target).await.unwrap();
    let b = pool.session(&target).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    pool.evict(&target).await;
    let c = pool.session(&target).await.unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(c.get(&["1.3.6.1.2.1.1.3.0".to_string()]).await.unwrap().len(), 1);
}
