pub mod browser;
pub mod metallum;
pub mod policy;

mod credentials;
mod data;
mod error;
mod utils;

pub use browser::{Browser, HttpBrowser, RenderedPage};
pub use credentials::Credentials;
pub use data::{upsert_statement, Dialect, MySqlWriter, SqlValue, SqliteWriter, UpsertWriter};
pub use error::CrawlerError;
pub use metallum::{AlbumRecord, CountryReport, Link, MetallumScraper};
pub use policy::{CrawlPolicy, RetryPolicy};

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Scraped records as written by `--json`.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub generated_at: DateTime<FixedOffset>,
    pub countries: Vec<&'a str>,
    pub albums: &'a [AlbumRecord],
}

impl<'a> Snapshot<'a> {
    pub fn new(countries: &'a [CountryReport], albums: &'a [AlbumRecord]) -> Snapshot<'a> {
        Snapshot {
            generated_at: utils::get_now(),
            countries: countries.iter().map(|r| r.country.as_str()).collect(),
            albums,
        }
    }

    pub fn to_json(&self) -> Result<String, CrawlerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_snapshot_json() {
        let albums = vec![AlbumRecord {
            band_name: "Nargie".to_string(),
            country: "Mongolia".to_string(),
            url: "https://www.metal-archives.com/albums/Nargie/Khar_Tolbo/222".to_string(),
            album: "Khar Tolbo".to_string(),
            year: "2014".to_string(),
            rating: 91,
            num_reviews: "3".to_string(),
            album_type: "Full-length".to_string(),
        }];
        let json = Snapshot::new(&[], &albums).to_json().expect("Json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("Valid json");
        assert_eq!(value["albums"][0]["rating"], 91);
        assert_eq!(value["albums"][0]["album_type"], "Full-length");
        assert!(value["generated_at"].is_string());
    }
}
