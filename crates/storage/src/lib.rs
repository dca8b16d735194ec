use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, SqliteConnection,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{Item, ItemDraft, ItemId, Video, VideoId};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts a new item after the current last position.
    pub async fn create_item(&self, draft: &ItemDraft) -> Result<Item> {
        let row = sqlx::query(
            "INSERT INTO items (name, quantity, price, date, sort_order)
             SELECT ?, ?, ?, ?, COALESCE(MAX(sort_order), -1) + 1 FROM items
             RETURNING id, sort_order",
        )
        .bind(&draft.name)
        .bind(draft.quantity)
        .bind(draft.price)
        .bind(draft.date)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert item")?;

        Ok(Item {
            id: ItemId(row.try_get::<i64, _>(0)?),
            name: draft.name.clone(),
            quantity: draft.quantity,
            price: draft.price,
            date: draft.date,
            sort_order: row.try_get::<i64, _>(1)?,
        })
    }

    pub async fn list_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            "SELECT id, name, quantity, price, date, sort_order
             FROM items
             ORDER BY sort_order ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    pub async fn load_item(&self, item_id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(
            "SELECT id, name, quantity, price, date, sort_order FROM items WHERE id = ?",
        )
        .bind(item_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    /// Replaces every editable field. `sort_order` is left untouched.
    pub async fn update_item(&self, item_id: ItemId, draft: &ItemDraft) -> Result<Option<Item>> {
        let row = sqlx::query(
            "UPDATE items SET name = ?, quantity = ?, price = ?, date = ?
             WHERE id = ?
             RETURNING id, name, quantity, price, date, sort_order",
        )
        .bind(&draft.name)
        .bind(draft.quantity)
        .bind(draft.price)
        .bind(draft.date)
        .bind(item_id.0)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update item {item_id}"))?;
        row.as_ref().map(item_from_row).transpose()
    }

    /// Deletes an item and renumbers the survivors to `0..n` in one transaction.
    pub async fn delete_item(&self, item_id: ItemId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(item_id.0)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to delete item {item_id}"))?
            .rows_affected();
        if deleted == 0 {
            return Ok(false);
        }
        renumber_densely(&mut *tx).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Writes `sort_order = index` for every listed id. Unknown ids are skipped;
    /// a repeated id keeps its last index. Returns the number of rows written.
    pub async fn reorder_items(&self, item_ids: &[ItemId]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for (index, item_id) in item_ids.iter().enumerate() {
            let position = i64::try_from(index).context("reorder list too long")?;
            written += sqlx::query("UPDATE items SET sort_order = ? WHERE id = ?")
                .bind(position)
                .bind(item_id.0)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to reposition item {item_id}"))?
                .rows_affected();
        }
        tx.commit().await.context("failed to commit reorder")?;
        debug!(requested = item_ids.len(), written, "items reordered");
        Ok(written)
    }

    pub async fn compact_sort_order(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let renumbered = renumber_densely(&mut *tx).await?;
        tx.commit().await?;
        Ok(renumbered)
    }

    pub async fn insert_video(&self, filename: &str, stored_path: &str) -> Result<Video> {
        let uploaded_at = Utc::now();
        let row = sqlx::query(
            "INSERT INTO videos (filename, stored_path, uploaded_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(filename)
        .bind(stored_path)
        .bind(uploaded_at)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert video")?;
        Ok(Video {
            id: VideoId(row.try_get::<i64, _>(0)?),
            filename: filename.to_string(),
            uploaded_at,
        })
    }

    pub async fn list_videos(&self) -> Result<Vec<Video>> {
        let rows = sqlx::query("SELECT id, filename, uploaded_at FROM videos ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                Ok(Video {
                    id: VideoId(r.try_get::<i64, _>(0)?),
                    filename: r.try_get::<String, _>(1)?,
                    uploaded_at: r.try_get::<DateTime<Utc>, _>(2)?,
                })
            })
            .collect()
    }

    pub async fn load_video_path(&self, video_id: VideoId) -> Result<Option<String>> {
        let row = sqlx::query("SELECT stored_path FROM videos WHERE id = ?")
            .bind(video_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    /// Removes the video row and returns where its bytes were stored.
    pub async fn delete_video(&self, video_id: VideoId) -> Result<Option<String>> {
        let row = sqlx::query("DELETE FROM videos WHERE id = ? RETURNING stored_path")
            .bind(video_id.0)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to delete video {video_id}"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    Ok(Item {
        id: ItemId(row.try_get::<i64, _>("id")?),
        name: row.try_get::<String, _>("name")?,
        quantity: row.try_get::<i64, _>("quantity")?,
        price: row.try_get::<f64, _>("price")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
        sort_order: row.try_get::<i64, _>("sort_order")?,
    })
}

async fn renumber_densely(conn: &mut SqliteConnection) -> Result<u64> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM items ORDER BY sort_order ASC, id ASC")
        .fetch_all(&mut *conn)
        .await?;
    let mut renumbered = 0;
    for (position, id) in ids.iter().enumerate() {
        renumbered += sqlx::query("UPDATE items SET sort_order = ? WHERE id = ? AND sort_order != ?")
            .bind(position as i64)
            .bind(*id)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }
    Ok(renumbered)
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
