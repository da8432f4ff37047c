//! SQLite implementation of [`CacheStorage`].
//!
//! Entries reference their generation with `ON DELETE CASCADE`, so deleting a
//! generation drops its entries in the same statement, and a write into a
//! generation that no longer exists fails the foreign key check.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::RequestKey;
use super::store::{CacheStorage, GenerationName, GenerationSummary};
use crate::Error;
use crate::request::StoredResponse;

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, generation: &GenerationName) -> Result<(), Error> {
        let name = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generations (name, created_at) VALUES (?1, ?2)
                    ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let name = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, generation: &GenerationName, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let name = generation.to_string();
        let hash = key.hash().to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT final_url, status_code, headers_json, body, stored_at
                    FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                let (url, status, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::StoreUnavailable(format!("corrupt headers for {url}: {e}")))?;

                Ok(Some(StoredResponse { url, status, headers, body: Bytes::from(body), stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    async fn put(
        &self, generation: &GenerationName, key: &RequestKey, response: &StoredResponse,
    ) -> Result<(), Error> {
        let name = generation.to_string();
        let key = key.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::StoreWriteFailed(e.to_string()))?;
        let response = response.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    generation, key_hash, method, url, final_url, status_code,
                    headers_json, body, stored_at, body_len
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(generation, key_hash) DO UPDATE SET
                    final_url = excluded.final_url,
                    status_code = excluded.status_code,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at,
                    body_len = excluded.body_len",
                    params![
                        &name,
                        key.hash(),
                        key.method(),
                        key.url(),
                        &response.url,
                        response.status,
                        &headers_json,
                        response.body.as_ref(),
                        &response.stored_at,
                        response.body.len() as i64,
                    ],
                )
                .map_err(|e| Error::StoreWriteFailed(format!("{name}: {e}")))?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, generation: &str) -> Result<Vec<String>, Error> {
        let name = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    async fn summary(&self, generation: &str) -> Result<Option<GenerationSummary>, Error> {
        let name = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Option<GenerationSummary>, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Ok(None);
                }

                let (entries, bytes): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(body_len), 0) FROM entries WHERE generation = ?1",
                    params![name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;

                Ok(Some(GenerationSummary { name, entries: entries as u64, bytes: bytes as u64 }))
            })
            .await
            .map_err(Error::from)
    }
}
