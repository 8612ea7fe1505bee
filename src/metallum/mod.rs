mod crawler;
mod data;
mod scrape;

pub use self::crawler::{
    extract_band_links, extract_country_links, extract_discography_rows, parse_row, AlbumFields,
    DiscographyRow, ParsedRow, BAND_LINK_CSS, COUNTRY_LINK_CSS, DISCOGRAPHY_ROW_CSS,
    NEXT_PAGE_CSS,
};
pub use self::data::{albums_schema, write_albums};
pub use self::scrape::{CountryReport, MetallumScraper};

use crate::SqlValue;
use serde::Serialize;
use std::fmt;

pub const BASE_URL: &str = "https://www.metal-archives.com/browse/country";

/// Destination columns, in the order of [`AlbumRecord::to_row`].
pub const COLUMNS: [&str; 8] = [
    "band_name",
    "country",
    "url",
    "album",
    "year",
    "rating",
    "num_reviews",
    "album_type",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumRecord {
    pub band_name: String,
    pub country: String,
    pub url: String,
    pub album: String,
    pub year: String,
    pub rating: u32,
    pub num_reviews: String,
    pub album_type: String,
}

impl AlbumRecord {
    pub fn new(band: &Link, country: &str, url: String, fields: AlbumFields) -> AlbumRecord {
        AlbumRecord {
            band_name: band.name.clone(),
            country: country.to_string(),
            url,
            album: fields.album,
            year: fields.year,
            rating: fields.rating,
            num_reviews: fields.num_reviews,
            album_type: fields.album_type,
        }
    }

    pub fn to_row(&self) -> Vec<SqlValue> {
        vec![
            self.band_name.as_str().into(),
            self.country.as_str().into(),
            self.url.as_str().into(),
            self.album.as_str().into(),
            self.year.as_str().into(),
            i64::from(self.rating).into(),
            self.num_reviews.as_str().into(),
            self.album_type.as_str().into(),
        ]
    }
}

impl fmt::Display for AlbumRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Band            : {} ({})", self.band_name, self.country)?;
        writeln!(f, "Album           : {}", self.album)?;
        writeln!(f, "Type            : {}", self.album_type)?;
        writeln!(f, "Year            : {}", self.year)?;
        writeln!(
            f,
            "Rating          : {}% ({} reviews)",
            self.rating, self.num_reviews
        )?;
        writeln!(f, "Url             : {}", self.url)
    }
}
