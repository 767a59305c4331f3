//! Redis / Valkey backed store
//!
//! Lists map onto Redis lists and job logs onto Redis streams, which is the
//! layout the upload workers already use. Moves between lists use LMOVE or
//! a MULTI block, so a job is always in exactly one list.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::streams::{StreamId, StreamRangeReply, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, Direction};
use tracing::{debug, info};

use crate::errors::ShipyardError;
use crate::models::log::{level_tag, parse_level_tag, LogRecord, NewLogRecord};
use crate::store::{LogReader, Store};
use crate::streams::cursor::Cursor;

/// Redis-backed [`Store`]
pub struct RedisStore {
    client: Client,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the server at `url` (`redis://` or `rediss://`)
    pub async fn connect(url: &str) -> Result<Self, ShipyardError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        info!("Connected to shared store");
        Ok(Self { client, conn })
    }
}

fn to_record(entry: &StreamId) -> Result<LogRecord, ShipyardError> {
    Ok(LogRecord {
        id: entry.id.parse()?,
        timestamp: entry.get::<String>("timestamp").unwrap_or_default(),
        level: parse_level_tag(&entry.get::<String>("level").unwrap_or_default()),
        line: entry.get::<String>("line").unwrap_or_default(),
    })
}

#[async_trait]
impl Store for RedisStore {
    async fn list_push_front(&self, key: &str, value: String) -> Result<(), ShipyardError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(key, value).await?;
        Ok(())
    }

    async fn list_push_back(&self, key: &str, value: String) -> Result<(), ShipyardError> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(key, value).await?;
        Ok(())
    }

    async fn list_move_back(&self, from: &str, to: &str) -> Result<Option<String>, ShipyardError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .lmove(from, to, Direction::Right, Direction::Right)
            .await?;
        Ok(value)
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>, ShipyardError> {
        let mut conn = self.conn.clone();
        let values: Vec<String> = conn.lrange(key, 0, -1).await?;
        Ok(values)
    }

    async fn list_replace(
        &self,
        from: &str,
        value: &str,
        to: &str,
        replacement: String,
    ) -> Result<usize, ShipyardError> {
        let mut conn = self.conn.clone();
        let (removed,): (usize,) = redis::pipe()
            .atomic()
            .lrem(from, 1, value)
            .rpush(to, replacement)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn list_clear(&self, key: &str) -> Result<usize, ShipyardError> {
        let mut conn = self.conn.clone();
        // LLEN and DEL in one MULTI so the count matches what was deleted
        let (len,): (usize,) = redis::pipe()
            .atomic()
            .llen(key)
            .del(key)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(len)
    }

    async fn value_get(&self, key: &str) -> Result<Option<String>, ShipyardError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn log_append(&self, key: &str, record: &NewLogRecord) -> Result<Cursor, ShipyardError> {
        let mut conn = self.conn.clone();
        let id: String = conn
            .xadd(
                key,
                "*",
                &[
                    ("line", record.line.as_str()),
                    ("timestamp", record.timestamp.as_str()),
                    ("level", level_tag(record.level)),
                ],
            )
            .await?;
        id.parse()
    }

    async fn log_range(
        &self,
        key: &str,
        after: Option<Cursor>,
        count: usize,
    ) -> Result<Vec<LogRecord>, ShipyardError> {
        let mut conn = self.conn.clone();
        let start = match after {
            Some(cursor) => format!("({}", cursor),
            None => "-".to_string(),
        };
        let reply: StreamRangeReply = conn.xrange_count(key, start, "+", count).await?;
        reply.ids.iter().map(to_record).collect()
    }

    async fn log_last_id(&self, key: &str) -> Result<Option<Cursor>, ShipyardError> {
        let mut conn = self.conn.clone();
        let reply: StreamRangeReply = conn.xrevrange_count(key, "+", "-", 1).await?;
        reply.ids.first().map(|entry| entry.id.parse()).transpose()
    }

    async fn log_reader(&self) -> Result<Box<dyn LogReader>, ShipyardError> {
        // A blocking XREAD holds its connection, so each reader gets its own
        let conn = self.client.get_multiplexed_async_connection().await?;
        debug!("Opened dedicated stream reader connection");
        Ok(Box::new(RedisLogReader { conn }))
    }
}

/// Blocking stream reader on a dedicated connection
pub struct RedisLogReader {
    conn: MultiplexedConnection,
}

#[async_trait]
impl LogReader for RedisLogReader {
    async fn read_after(
        &mut self,
        key: &str,
        after: Cursor,
        block: Duration,
        count: usize,
    ) -> Result<Vec<LogRecord>, ShipyardError> {
        let options = StreamReadOptions::default()
            .block(block.as_millis() as usize)
            .count(count);
        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[key], &[after.to_string()], &options)
            .await?;

        let Some(reply) = reply else {
            return Ok(Vec::new());
        };
        reply
            .keys
            .iter()
            .flat_map(|stream| stream.ids.iter())
            .map(to_record)
            .collect()
    }
}
