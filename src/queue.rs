use anyhow::Context;
use redis::{Commands, ConnectionLike};

/// The worker loop talks to the queue through this seam so tests can run it
/// against an in-process double.
pub trait Queue {
    /// Current transport state; the loop's continuation condition.
    fn is_alive(&self) -> bool;

    /// Pop the head of the first ready list among `queues`, blocking up to
    /// `timeout_secs`. `None` means timeout: nothing was consumed.
    fn blocking_pop(&mut self, queues: &[String], timeout_secs: f64) -> anyhow::Result<Option<(String, String)>>;

    /// Append `payload` to the tail of `queue`.
    fn push(&mut self, queue: &str, payload: &str) -> anyhow::Result<()>;

    /// Set a TTL on a previously pushed key (one-shot result delivery).
    fn expire(&mut self, key: &str, ttl_secs: i64) -> anyhow::Result<()>;
}

pub struct RedisQueue {
    conn: redis::Connection,
}

impl RedisQueue {
    /// Open a persistent connection. When a password is supplied the AUTH
    /// happens during connection setup; the PING confirms the session is
    /// actually usable before the loop starts. Failure here is fatal to the
    /// process, there is no retry.
    pub fn connect(host: &str, port: u16, password: Option<&str>) -> anyhow::Result<Self> {
        let info = redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(host.to_string(), port),
            redis: redis::RedisConnectionInfo {
                password: password.map(str::to_string),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info).context("invalid redis connection parameters")?;
        let mut conn = client
            .get_connection()
            .with_context(|| format!("failed connecting to redis at {host}:{port}"))?;

        let pong: String = redis::cmd("PING")
            .query(&mut conn)
            .context("redis did not answer PING (bad password?)")?;
        log::info!("Connected to redis at {}:{} ({})", host, port, pong);

        Ok(Self { conn })
    }
}

impl Queue for RedisQueue {
    fn is_alive(&self) -> bool {
        self.conn.is_open()
    }

    fn blocking_pop(&mut self, queues: &[String], timeout_secs: f64) -> anyhow::Result<Option<(String, String)>> {
        let reply: Option<(String, String)> = self
            .conn
            .blpop(queues, timeout_secs)
            .context("BLPOP failed")?;
        Ok(reply)
    }

    fn push(&mut self, queue: &str, payload: &str) -> anyhow::Result<()> {
        let _: () = self
            .conn
            .rpush(queue, payload)
            .with_context(|| format!("RPUSH to {queue} failed"))?;
        Ok(())
    }

    fn expire(&mut self, key: &str, ttl_secs: i64) -> anyhow::Result<()> {
        let _: () = self
            .conn
            .expire(key, ttl_secs)
            .with_context(|| format!("EXPIRE on {key} failed"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_to_unreachable_host_fails() {
        // Port 1 on localhost is refused immediately; no listener, no retry.
        let err = match RedisQueue::connect("127.0.0.1", 1, None) {
            Ok(_) => panic!("connect to a closed port must fail"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
