use crate::{browser::RenderedPage, metallum::Link};
use itertools::Itertools;
use lazy_regex::regex;
use lazy_static::lazy_static;
use scraper::{ElementRef, Selector};

pub const COUNTRY_LINK_CSS: &str = r#"div[class="countryCol"] > a"#;
pub const BAND_LINK_CSS: &str = r#"table[id="bandListCountry"] > tbody > tr > td > a"#;
pub const NEXT_PAGE_CSS: &str =
    r#"div[id="bandListCountry_paginate"] > a[class="next paginate_button"]"#;
pub const DISCOGRAPHY_ROW_CSS: &str = r#"table[class="display discog"] > tbody > tr"#;

const E: &str = "Invalid selector";
lazy_static! {
    static ref COUNTRY_LINK: Selector = Selector::parse(COUNTRY_LINK_CSS).expect(E);
    static ref BAND_LINK: Selector = Selector::parse(BAND_LINK_CSS).expect(E);
    static ref DISCOGRAPHY_ROW: Selector = Selector::parse(DISCOGRAPHY_ROW_CSS).expect(E);
    static ref A: Selector = Selector::parse("a").expect(E);
}

/// One row of a band's discography table, as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscographyRow {
    pub text: String,
    /// Target of the first link in the row, the release page.
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumFields {
    pub album: String,
    pub album_type: String,
    pub year: String,
    pub num_reviews: String,
    pub rating: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRow {
    Rated(AlbumFields),
    /// The last token carries no `%`, the release has no reviews yet.
    Unrated,
    Unparseable,
}

/// Text of an element with its text nodes separated by single spaces.
fn visible_text(el: ElementRef) -> String {
    el.text().flat_map(str::split_whitespace).join(" ")
}

fn links(page: &RenderedPage, selector: &Selector) -> Vec<Link> {
    let doc = page.parse();
    doc.select(selector)
        .filter_map(|a| {
            a.value().attr("href").map(|href| Link {
                name: visible_text(a),
                url: page.absolute(href),
            })
        })
        .collect()
}

/// Country links whose label is exactly one of `countries`, in document order.
pub fn extract_country_links<S: AsRef<str>>(page: &RenderedPage, countries: &[S]) -> Vec<Link> {
    links(page, &COUNTRY_LINK)
        .into_iter()
        .filter(|link| {
            countries
                .iter()
                .map(AsRef::as_ref)
                .any(|c: &str| c == link.name)
        })
        .collect()
}

pub fn extract_band_links(page: &RenderedPage) -> Vec<Link> {
    links(page, &BAND_LINK)
}

pub fn extract_discography_rows(page: &RenderedPage) -> Vec<DiscographyRow> {
    let doc = page.parse();
    doc.select(&DISCOGRAPHY_ROW)
        .map(|tr| DiscographyRow {
            text: visible_text(tr),
            url: tr
                .select(&A)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| page.absolute(href)),
        })
        .collect()
}

/// Reads a discography row right to left: rating, review count, year and
/// release type are the last four tokens, everything before them is the
/// title.
///
/// Positional on purpose. A type spanning two words ("Live album", "Split
/// video") pushes its first word into the title and leaves the second as the
/// type.
pub fn parse_row(text: &str) -> ParsedRow {
    let tokens = text.split_whitespace().collect::<Vec<_>>();
    match tokens.last() {
        Some(last) if last.contains('%') => {}
        _ => return ParsedRow::Unrated,
    }
    let [title @ .., album_type, year, num_reviews, rating] = tokens.as_slice() else {
        return ParsedRow::Unparseable;
    };
    let Ok(rating) = regex!(r"[()%]").replace_all(rating, "").parse::<u32>() else {
        return ParsedRow::Unparseable;
    };
    ParsedRow::Rated(AlbumFields {
        album: title.join(" "),
        album_type: album_type.to_string(),
        year: year.to_string(),
        num_reviews: num_reviews.to_string(),
        rating,
    })
}
