use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::controller::Photo;
use crate::error::{PhotoError, PhotoResult};
use crate::storage::template::RecordStore;

const SQLITE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS photo (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file TEXT NOT NULL UNIQUE
);"#;

const MYSQL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS photo (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    file VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL UNIQUE
);"#;

const FIND_QRY: &str = "SELECT id, file FROM photo WHERE id = ?;";
const FIND_BY_FILE_QRY: &str = "SELECT id, file FROM photo WHERE file = ?;";
const FIND_ALL_QRY: &str = "SELECT id, file FROM photo ORDER BY file ASC;";
const INSERT_QRY: &str = "INSERT INTO photo (file) VALUES (?);";
const DELETE_QRY: &str = "DELETE FROM photo WHERE id = ?;";

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub async fn connect(connection_uri: &str, pool_size: u32) -> PhotoResult<Self> {
        let options = SqliteConnectOptions::from_str(connection_uri)?.create_if_missing(true);

        // Every connection to an in-memory database gets its own database,
        // so the pool must hold exactly one that never expires.
        let pool = if connection_uri.contains(":memory:") {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(pool_size)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.ensure_table().await?;
        Ok(store)
    }

    async fn ensure_table(&self) -> PhotoResult<()> {
        sqlx::query(SQLITE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    pub async fn connect(connection_uri: &str, pool_size: u32) -> PhotoResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(pool_size)
            .connect(connection_uri)
            .await?;

        let store = Self { pool };
        store.ensure_table().await?;
        Ok(store)
    }

    async fn ensure_table(&self) -> PhotoResult<()> {
        sqlx::query(MYSQL_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

/// Implements `RecordStore` for a pool backed store.
///
/// The queries are identical between drivers, only the way the
/// generated id is read back differs.
macro_rules! record_store {
    ( $store:ty, $last_id:ident ) => {
        #[async_trait]
        impl RecordStore for $store {
            async fn find(&self, id: i64) -> PhotoResult<Photo> {
                sqlx::query_as::<_, Photo>(FIND_QRY)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or(PhotoError::NotFound(id))
            }

            async fn find_by_file(&self, basename: &str) -> PhotoResult<Option<Photo>> {
                let row = sqlx::query_as::<_, Photo>(FIND_BY_FILE_QRY)
                    .bind(basename)
                    .fetch_optional(&self.pool)
                    .await?;

                Ok(row)
            }

            async fn find_all(&self) -> PhotoResult<Vec<Photo>> {
                let rows = sqlx::query_as::<_, Photo>(FIND_ALL_QRY)
                    .fetch_all(&self.pool)
                    .await?;

                Ok(rows)
            }

            async fn append(&self, basename: &str) -> PhotoResult<Photo> {
                let result = sqlx::query(INSERT_QRY)
                    .bind(basename)
                    .execute(&self.pool)
                    .await?;

                Ok(Photo {
                    id: result.$last_id() as i64,
                    file: basename.to_string(),
                })
            }

            async fn delete(&self, id: i64) -> PhotoResult<()> {
                sqlx::query(DELETE_QRY)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;

                Ok(())
            }
        }
    };
}

record_store!(SqliteRecordStore, last_insert_rowid);
record_store!(MySqlRecordStore, last_insert_id);

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> PhotoResult<SqliteRecordStore> {
        SqliteRecordStore::connect("sqlite::memory:", 1).await
    }

    #[tokio::test]
    async fn empty_table_lists_nothing() -> anyhow::Result<()> {
        let store = store().await?;
        assert!(store.find_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() -> anyhow::Result<()> {
        let store = store().await?;

        let first = store.append("b.jpeg").await?;
        let second = store.append("a.jpeg").await?;
        assert!(second.id > first.id);

        assert_eq!(store.find(first.id).await?, first);
        assert_eq!(store.find_by_file("a.jpeg").await?, Some(second));
        assert_eq!(store.find_by_file("c.jpeg").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn lists_by_file_name() -> anyhow::Result<()> {
        let store = store().await?;
        for name in ["zebra.jpeg", "apple.jpeg", "mango.jpeg"] {
            store.append(name).await?;
        }

        let files: Vec<String> = store
            .find_all()
            .await?
            .into_iter()
            .map(|photo| photo.file)
            .collect();

        assert_eq!(files, vec!["apple.jpeg", "mango.jpeg", "zebra.jpeg"]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() -> anyhow::Result<()> {
        let store = store().await?;
        let err = store.find(42).await.unwrap_err();
        assert!(err.is_not_found());

        // Deleting something that isn't there is fine.
        store.delete(42).await?;
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_row() -> anyhow::Result<()> {
        let store = store().await?;
        let photo = store.append("cat.jpeg").await?;

        store.delete(photo.id).await?;
        assert!(store.find(photo.id).await.unwrap_err().is_not_found());
        assert!(store.find_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn file_names_differing_in_case_are_distinct() -> anyhow::Result<()> {
        let store = store().await?;
        let upper = store.append("Cat.jpeg").await?;
        let lower = store.append("cat.jpeg").await?;

        assert_ne!(upper.id, lower.id);
        assert_eq!(store.find_by_file("cat.jpeg").await?, Some(lower));
        assert_eq!(store.find_by_file("Cat.jpeg").await?, Some(upper));
        Ok(())
    }

    #[test]
    fn mysql_file_column_compares_bytes() {
        let column = MYSQL_TABLE
            .lines()
            .find(|line| line.trim_start().starts_with("file "))
            .expect("file column");

        assert!(column.contains("COLLATE utf8mb4_bin"), "{}", column);
        assert!(column.contains("UNIQUE"), "{}", column);
    }

    #[tokio::test]
    async fn duplicate_file_names_are_rejected() -> anyhow::Result<()> {
        let store = store().await?;
        store.append("cat.jpeg").await?;

        let err = store.append("cat.jpeg").await.unwrap_err();
        assert!(matches!(err, PhotoError::Database(_)), "got {:?}", err);
        Ok(())
    }
}
