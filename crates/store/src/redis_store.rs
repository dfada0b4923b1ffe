//! Redis-backed record store.
//!
//! Records are JSON strings under `{namespace}{key}`; lists map onto Redis
//! lists (RPUSH / LPOP / LRANGE). Each call opens its own connection, which
//! fits the one-invocation-per-trigger execution model.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::instrument;

use crate::traits::{RecordStore, StoreError};

/// Default key namespace.
const DEFAULT_NAMESPACE: &str = "cadence:";

/// Keys fetched per SCAN round trip.
const SCAN_COUNT: usize = 200;

#[derive(Debug, Clone)]
pub struct RedisRecordStore {
    client: Arc<redis::Client>,
    namespace: String,
}

impl RedisRecordStore {
    /// Create a store for `redis_url` (e.g. "redis://localhost:6379").
    pub fn new(redis_url: impl AsRef<str>, namespace: Option<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            namespace: namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        })
    }

    fn conn(&self) -> Result<redis::Connection, StoreError> {
        self.client
            .get_connection()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }
}

fn command_error(op: &str, e: redis::RedisError) -> StoreError {
    StoreError::Command(format!("{op} failed: {e}"))
}

impl RecordStore for RedisRecordStore {
    #[instrument(skip(self), err)]
    fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError> {
        let mut conn = self.conn()?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key(key))
            .query(&mut conn)
            .map_err(|e| command_error("GET", e))?;

        raw.map(|s| {
            serde_json::from_str(&s).map_err(|e| StoreError::Deserialization {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
    }

    #[instrument(skip(self, value), err)]
    fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(&value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.conn()?;
        redis::cmd("SET")
            .arg(self.key(key))
            .arg(payload)
            .query::<()>(&mut conn)
            .map_err(|e| command_error("SET", e))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        redis::cmd("DEL")
            .arg(self.key(key))
            .query::<i64>(&mut conn)
            .map_err(|e| command_error("DEL", e))?;
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn()?;
        let pattern = format!("{}*", self.key(prefix));
        let mut cursor: u64 = 0;
        let mut out = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query(&mut conn)
                .map_err(|e| command_error("SCAN", e))?;

            out.extend(
                batch
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&self.namespace).map(str::to_string)),
            );

            if next == 0 {
                break;
            }
            cursor = next;
        }

        out.sort();
        out.dedup();
        Ok(out)
    }

    #[instrument(skip(self), err)]
    fn push_back(&self, list: &str, item: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        redis::cmd("RPUSH")
            .arg(self.key(list))
            .arg(item)
            .query::<i64>(&mut conn)
            .map_err(|e| command_error("RPUSH", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    fn pop_front(&self, list: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn()?;
        redis::cmd("LPOP")
            .arg(self.key(list))
            .query(&mut conn)
            .map_err(|e| command_error("LPOP", e))
    }

    fn list_range(&self, list: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;
        let start = -(limit.min(isize::MAX as usize) as isize);
        redis::cmd("LRANGE")
            .arg(self.key(list))
            .arg(start)
            .arg(-1)
            .query(&mut conn)
            .map_err(|e| command_error("LRANGE", e))
    }

    fn list_len(&self, list: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        redis::cmd("LLEN")
            .arg(self.key(list))
            .query(&mut conn)
            .map_err(|e| command_error("LLEN", e))
    }
}
