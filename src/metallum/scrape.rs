use super::{crawler, AlbumRecord, Link, ParsedRow, BASE_URL, NEXT_PAGE_CSS};
use crate::{browser::Browser, policy::CrawlPolicy, utils, CrawlerError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CountryReport {
    pub country: String,
    pub bands: usize,
    pub albums: usize,
    /// Time spent on band pages only.
    pub band_elapsed: Duration,
    /// Band list pagination plus band pages.
    pub total_elapsed: Duration,
}

impl CountryReport {
    pub fn requests_per_second(&self) -> f64 {
        utils::rate(self.bands, self.band_elapsed)
    }
}

/// Walks the country index, each country's paginated band list and every
/// band's discography, one page at a time through a single browser session.
pub struct MetallumScraper<B> {
    browser: B,
    min_rating: u32,
    base_url: String,
    policy: CrawlPolicy,
    reports: Vec<CountryReport>,
}

impl<B: Browser> MetallumScraper<B> {
    pub fn new(browser: B, min_rating: u32) -> MetallumScraper<B> {
        MetallumScraper {
            browser,
            min_rating,
            base_url: BASE_URL.to_string(),
            policy: CrawlPolicy::default(),
            reports: vec![],
        }
    }

    pub fn with_policy(mut self, policy: CrawlPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn reports(&self) -> &[CountryReport] {
        &self.reports
    }

    #[cfg(test)]
    pub(crate) fn browser(&self) -> &B {
        &self.browser
    }

    /// Country links on the current page whose label is one of `countries`.
    pub async fn list_country_links<S: AsRef<str> + Sync>(
        &mut self,
        countries: &[S],
    ) -> Result<Vec<Link>, CrawlerError> {
        let page = self.browser.document().await?;
        Ok(crawler::extract_country_links(&page, countries))
    }

    /// Every band on every page of a country's band list, following the
    /// "next" control until it disappears.
    pub async fn list_band_links(&mut self, country_url: &str) -> Result<Vec<Link>, CrawlerError> {
        let mut bands = vec![];
        self.browser.navigate(country_url).await?;
        for page_no in 1..=self.policy.max_pages {
            sleep(self.policy.page_delay).await;
            let page = self.browser.document().await?;
            let found = crawler::extract_band_links(&page);
            debug!("{} bands on page {} of {}", found.len(), page_no, country_url);
            bands.extend(found);

            match self.browser.click(NEXT_PAGE_CSS).await {
                Ok(()) => {}
                Err(CrawlerError::ElementNotFound(_)) => return Ok(bands),
                Err(e) => return Err(e),
            }
        }
        Err(CrawlerError::PaginationLimit {
            url: country_url.to_string(),
            max_pages: self.policy.max_pages,
        })
    }

    /// Rated releases of one band with a rating of at least the configured
    /// minimum.
    pub async fn parse_band_albums(
        &mut self,
        country: &str,
        band: &Link,
    ) -> Result<Vec<AlbumRecord>, CrawlerError> {
        let retry = self.policy.empty_discography.clone();
        let mut attempt = 0;
        let rows = loop {
            attempt += 1;
            self.browser.navigate(&band.url).await?;
            sleep(self.policy.render_delay).await;
            let rows = crawler::extract_discography_rows(&self.browser.document().await?);
            if !rows.is_empty() {
                break rows;
            }
            if attempt >= retry.max_attempts {
                return Err(CrawlerError::RetriesExhausted {
                    url: band.url.clone(),
                    attempts: attempt,
                });
            }
            let delay = retry.delay_after(attempt);
            warn!(
                "Empty discography for {} (attempt {}), retrying in {:?}",
                band.url, attempt, delay
            );
            sleep(delay).await;
        };

        let mut albums = vec![];
        for row in rows {
            match crawler::parse_row(&row.text) {
                ParsedRow::Rated(fields) if fields.rating >= self.min_rating => match row.url {
                    Some(url) => albums.push(AlbumRecord::new(band, country, url, fields)),
                    None => warn!("No release link in row {:?} of {}", row.text, band.url),
                },
                ParsedRow::Rated(_) | ParsedRow::Unrated => {}
                ParsedRow::Unparseable => debug!("Unparseable row {:?} of {}", row.text, band.url),
            }
        }
        Ok(albums)
    }

    /// Albums of every band in `bands`. Also returns the time it took.
    pub async fn scrape_bands_for_country(
        &mut self,
        country: &str,
        bands: &[Link],
    ) -> Result<(Vec<AlbumRecord>, Duration), CrawlerError> {
        let mut results = vec![];
        let start = Instant::now();
        for band in bands {
            results.extend(self.parse_band_albums(country, band).await?);
        }
        let elapsed = start.elapsed();
        info!(
            "{} requests over {:.2} s = {:.3} per second",
            bands.len(),
            elapsed.as_secs_f64(),
            utils::rate(bands.len(), elapsed)
        );
        Ok((results, elapsed))
    }

    /// Scrapes the requested countries in the order the index lists them.
    /// Requested names missing from the index are skipped.
    pub async fn scrape_all<S: AsRef<str> + Sync>(
        &mut self,
        countries: &[S],
    ) -> Result<Vec<AlbumRecord>, CrawlerError> {
        let base_url = self.base_url.clone();
        self.browser.navigate(&base_url).await?;
        let country_links = self.list_country_links(countries).await?;
        for missing in countries
            .iter()
            .map(AsRef::as_ref)
            .filter(|c: &&str| !country_links.iter().any(|l| l.name == *c))
        {
            warn!("Country {} not found on {}", missing, base_url);
        }

        let mut results = vec![];
        for country in country_links {
            let start = Instant::now();
            let bands = self.list_band_links(&country.url).await?;
            let (albums, band_elapsed) = self.scrape_bands_for_country(&country.name, &bands).await?;
            let total_elapsed = start.elapsed();
            info!(
                "Processing time for {} is {:.2} s",
                country.name,
                total_elapsed.as_secs_f64()
            );
            self.reports.push(CountryReport {
                country: country.name,
                bands: bands.len(),
                albums: albums.len(),
                band_elapsed,
                total_elapsed,
            });
            results.extend(albums);
        }
        Ok(results)
    }

    pub async fn close(&mut self) -> Result<(), CrawlerError> {
        self.browser.close().await
    }
}
