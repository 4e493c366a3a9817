//! Cover lookup — finds a thumbnail for a prescribed book. Lookups never fail the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

const GOOGLE_BOOKS_URL: &str = "https://www.googleapis.com/books/v1/volumes";

#[async_trait]
pub trait CoverLookup: Send + Sync {
    async fn find_cover(&self, title: &str, author: &str) -> Option<String>;
}

/// Used when cover lookups are disabled.
#[derive(Debug, Default, Clone)]
pub struct NoCovers;

#[async_trait]
impl CoverLookup for NoCovers {
    async fn find_cover(&self, _title: &str, _author: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    items: Option<Vec<Volume>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

/// `intitle:<title>+inauthor:<author>`, author part omitted when blank.
pub fn volume_query(title: &str, author: &str) -> String {
    let mut query = format!("intitle:{}", title.trim());
    if !author.trim().is_empty() {
        query.push_str(&format!("+inauthor:{}", author.trim()));
    }
    query
}

/// `thumbnail`, else `smallThumbnail`, from the first volume.
fn pick_thumbnail(body: VolumesResponse) -> Option<String> {
    let links = body
        .items?
        .into_iter()
        .next()?
        .volume_info?
        .image_links?;
    links.thumbnail.or(links.small_thumbnail)
}

/// Google Books public volumes API.
pub struct GoogleBooksCovers {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleBooksCovers {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_base_url(GOOGLE_BOOKS_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn lookup(&self, title: &str, author: &str) -> Result<Option<String>, reqwest::Error> {
        let query = volume_query(title, author);
        let body: VolumesResponse = self
            .client
            .get(&self.base_url)
            .query(&[("q", query.as_str()), ("maxResults", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(pick_thumbnail(body))
    }
}

#[async_trait]
impl CoverLookup for GoogleBooksCovers {
    async fn find_cover(&self, title: &str, author: &str) -> Option<String> {
        if title.trim().is_empty() {
            return None;
        }
        match self.lookup(title, author).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, title, "cover lookup failed");
                None
            }
        }
    }
}
