use crate::{utils, Credentials, CrawlerError};
use itertools::Itertools;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    MySqlPool, SqlitePool,
};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

/// Parameterized INSERT that overwrites every listed column when the row
/// collides with an existing key.
pub fn upsert_statement<C: AsRef<str>>(dialect: Dialect, table: &str, columns: &[C]) -> String {
    let names = columns.iter().map(AsRef::as_ref).join(", ");
    let placeholders = columns.iter().map(|_| "?").join(", ");
    let insert = format!("INSERT INTO {} ({}) VALUES ({})", table, names, placeholders);
    match dialect {
        Dialect::MySql => format!(
            "{} ON DUPLICATE KEY UPDATE {}",
            insert,
            columns
                .iter()
                .map(|c| format!("{0} = VALUES({0})", c.as_ref()))
                .join(", ")
        ),
        Dialect::Sqlite => format!(
            "{} ON CONFLICT DO UPDATE SET {}",
            insert,
            columns
                .iter()
                .map(|c| format!("{0} = excluded.{0}", c.as_ref()))
                .join(", ")
        ),
    }
}

fn check_widths<C>(columns: &[C], rows: &[Vec<SqlValue>]) -> Result<(), CrawlerError> {
    match rows.iter().position(|row| row.len() != columns.len()) {
        Some(index) => Err(CrawlerError::RowWidth {
            index,
            width: rows[index].len(),
            expected: columns.len(),
        }),
        None => Ok(()),
    }
}

#[async_trait::async_trait]
pub trait UpsertWriter: Send + Sync {
    /// Upserts every row in one transaction. Either all rows are committed or
    /// none are. Returns the affected row count reported by the driver.
    async fn write_rows(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, CrawlerError>;

    async fn close(&self);
}

pub struct MySqlWriter {
    pool: MySqlPool,
}

impl MySqlWriter {
    pub async fn connect(credentials: &Credentials) -> Result<MySqlWriter, CrawlerError> {
        let opt = MySqlConnectOptions::new()
            .host(&credentials.host)
            .username(&credentials.user)
            .password(&credentials.password)
            .database(&credentials.database);
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(opt)
            .await?;
        debug!("Connected to {}@{}", credentials.database, credentials.host);
        Ok(MySqlWriter { pool })
    }
}

#[async_trait::async_trait]
impl UpsertWriter for MySqlWriter {
    async fn write_rows(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, CrawlerError> {
        check_widths(columns, rows)?;
        let query = upsert_statement(Dialect::MySql, table, columns);
        let mut affected = 0;
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let mut q = sqlx::query(&query);
            for value in row {
                q = match value {
                    SqlValue::Text(s) => q.bind(s.as_str()),
                    SqlValue::Integer(i) => q.bind(*i),
                };
            }
            affected += q.execute(&mut tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct SqliteWriter {
    pool: SqlitePool,
}

impl SqliteWriter {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<SqliteWriter, CrawlerError> {
        let opt = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opt)
            .await?;
        Ok(SqliteWriter { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> SqliteWriter {
        SqliteWriter { pool }
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs `schema` unless `table` already exists.
    pub async fn create_table(&self, table: &str, schema: &str) -> Result<(), CrawlerError> {
        if !utils::is_table_exists(&self.pool, table).await? {
            sqlx::query(schema).execute(&self.pool).await?;
            debug!("Created {}", table);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UpsertWriter for SqliteWriter {
    async fn write_rows(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, CrawlerError> {
        check_widths(columns, rows)?;
        let query = upsert_statement(Dialect::Sqlite, table, columns);
        let mut affected = 0;
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let mut q = sqlx::query(&query);
            for value in row {
                q = match value {
                    SqlValue::Text(s) => q.bind(s.as_str()),
                    SqlValue::Integer(i) => q.bind(*i),
                };
            }
            affected += q.execute(&mut tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlx::Row;

    const COLUMNS: [&str; 3] = ["url", "album", "rating"];

    async fn writer() -> SqliteWriter {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("In-memory database");
        let writer = SqliteWriter::from_pool(pool);
        writer
            .create_table(
                "albums",
                "CREATE TABLE albums (url TEXT PRIMARY KEY, album TEXT, rating INTEGER CHECK (rating <= 100))",
            )
            .await
            .expect("Create table");
        writer
    }

    fn row(url: &str, album: &str, rating: i64) -> Vec<SqlValue> {
        vec![url.into(), album.into(), rating.into()]
    }

    async fn dump(writer: &SqliteWriter) -> Vec<(String, String, i64)> {
        sqlx::query("SELECT url, album, rating FROM albums ORDER BY url")
            .fetch_all(writer.get_pool())
            .await
            .expect("Select")
            .into_iter()
            .map(|r| (r.get(0), r.get(1), r.get(2)))
            .collect()
    }

    #[test]
    fn test_mysql_statement() {
        assert_eq!(
            upsert_statement(Dialect::MySql, "albums", &COLUMNS),
            "INSERT INTO albums (url, album, rating) VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE url = VALUES(url), album = VALUES(album), rating = VALUES(rating)"
        );
    }

    #[test]
    fn test_sqlite_statement() {
        assert_eq!(
            upsert_statement(Dialect::Sqlite, "albums", &COLUMNS),
            "INSERT INTO albums (url, album, rating) VALUES (?, ?, ?) \
             ON CONFLICT DO UPDATE SET url = excluded.url, album = excluded.album, rating = excluded.rating"
        );
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let writer = writer().await;
        let rows = vec![row("a", "Blood", 98), row("b", "Bones", 90)];

        writer.write_rows("albums", &COLUMNS, &rows).await.expect("Write");
        let first = dump(&writer).await;
        writer.write_rows("albums", &COLUMNS, &rows).await.expect("Rewrite");
        assert_eq!(dump(&writer).await, first);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_overwrites() {
        let writer = writer().await;
        writer
            .write_rows("albums", &COLUMNS, &[row("a", "Blood", 98)])
            .await
            .expect("Write");
        writer
            .write_rows("albums", &COLUMNS, &[row("a", "Blood (remaster)", 87)])
            .await
            .expect("Overwrite");
        assert_eq!(
            dump(&writer).await,
            vec![("a".to_string(), "Blood (remaster)".to_string(), 87)]
        );
    }

    #[tokio::test]
    async fn test_width_mismatch_writes_nothing() {
        let writer = writer().await;
        let rows = vec![row("a", "Blood", 98), vec!["b".into()]];
        let err = writer.write_rows("albums", &COLUMNS, &rows).await;
        assert!(matches!(
            err,
            Err(CrawlerError::RowWidth {
                index: 1,
                width: 1,
                expected: 3
            })
        ));
        assert!(dump(&writer).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_row_rolls_back_batch() {
        let writer = writer().await;
        let rows = vec![row("a", "Blood", 98), row("b", "Bones", 120)];
        let err = writer.write_rows("albums", &COLUMNS, &rows).await;
        assert!(matches!(err, Err(CrawlerError::Database(_))));
        assert!(dump(&writer).await.is_empty());
    }
}
