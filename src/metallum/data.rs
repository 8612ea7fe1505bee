use super::{AlbumRecord, COLUMNS};
use crate::{CrawlerError, UpsertWriter};
use tracing::info;

/// Schema used when the destination is a local SQLite file. A MySQL
/// destination is expected to exist already.
pub fn albums_schema(table: &str) -> String {
    format!(
        r#"
            CREATE TABLE {} (
                band_name TEXT,
                country TEXT,
                url TEXT PRIMARY KEY,
                album TEXT,
                year TEXT,
                rating INTEGER,
                num_reviews TEXT,
                album_type TEXT
            )
        "#,
        table
    )
}

pub async fn write_albums<W: UpsertWriter + ?Sized>(
    writer: &W,
    table: &str,
    records: &[AlbumRecord],
) -> Result<u64, CrawlerError> {
    let rows = records.iter().map(AlbumRecord::to_row).collect::<Vec<_>>();
    let affected = writer.write_rows(table, &COLUMNS, &rows).await?;
    info!("Upserted {} albums into {}", records.len(), table);
    Ok(affected)
}
