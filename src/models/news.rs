use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use super::Source;
use crate::error::DataError;
use crate::serde_utils::{local_to_fixed, parse_timestamp};

/// One scraped article. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNewsItem")]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub content: String,
    pub summary: String,
    pub image: String,
    pub source: Source,
    pub created: DateTime<FixedOffset>,
    pub created_ad: Option<NaiveDate>,
    pub comments: Vec<Comment>,
}

impl NewsItem {
    /// Calendar date of publication in the given zone.
    pub fn created_on<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.created.with_timezone(tz).date_naive()
    }
}

#[derive(Deserialize)]
struct RawNewsItem {
    id: i64,
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    image: Option<String>,
    source: Source,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    created_ad: Option<NaiveDate>,
    #[serde(default)]
    comments: Vec<Comment>,
}

impl TryFrom<RawNewsItem> for NewsItem {
    type Error = DataError;

    // Scraped `created` values are sometimes free text; the ingestion date stands in for them.
    fn try_from(raw: RawNewsItem) -> Result<Self, Self::Error> {
        let created = raw
            .created
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| {
                raw.created_ad
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .and_then(local_to_fixed)
            })
            .ok_or_else(|| DataError::invalid_value("created", raw.created.clone().unwrap_or_default()))?;

        Ok(Self {
            id: raw.id,
            title: raw.title,
            author: raw.author,
            content: raw.content,
            summary: raw.summary,
            image: raw.image.unwrap_or_default(),
            source: raw.source,
            created,
            created_ad: raw.created_ad,
            comments: raw.comments,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user: i64,
    pub news: i64,
    pub comment: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// Body of a comment create/update request.
#[derive(Debug, Clone, Serialize)]
pub struct CommentDraft {
    pub user: i64,
    pub news: i64,
    pub comment: String,
}

/// Every item held for one source at one fetch. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub source: Source,
    pub items: Arc<[NewsItem]>,
    pub fetched_at: DateTime<FixedOffset>,
}

impl FeedSnapshot {
    pub fn new(source: Source, items: Vec<NewsItem>) -> Self {
        Self {
            source,
            items: items.into(),
            fetched_at: Local::now().fixed_offset(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Split against the client's current local date.
    pub fn partition(&self) -> Partition<'_> {
        self.partition_at(&Local::now())
    }

    /// Stable split into items published on `now`'s calendar date and the rest.
    pub fn partition_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Partition<'_> {
        let current = now.date_naive();
        let tz = now.timezone();
        let (today, earlier): (Vec<_>, Vec<_>) = self
            .items
            .iter()
            .partition(|item| item.created_on(&tz) == current);
        Partition { today, earlier }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition<'a> {
    pub today: Vec<&'a NewsItem>,
    pub earlier: Vec<&'a NewsItem>,
}

impl<'a> Partition<'a> {
    /// Display order: today's items, then earlier ones.
    pub fn ordered(&self) -> impl Iterator<Item = &'a NewsItem> + '_ {
        self.today.iter().chain(self.earlier.iter()).copied()
    }
}
