use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

use crate::error::ClientError;

/// A publisher the backend knows how to scrape.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    AsRefStr,
    strum::Display,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[serde(alias = "Nagarik", alias = "Nagarik News")]
    #[strum(to_string = "nagarik", serialize = "nagarik news")]
    Nagarik,
    #[serde(alias = "Onlinekhabar", alias = "OnlineKhabar")]
    Onlinekhabar,
    #[serde(alias = "Ekantipur")]
    Ekantipur,
}

impl Source {
    pub fn all() -> impl Iterator<Item = Source> {
        Source::iter()
    }

    /// Strict lookup of a source key.
    pub fn parse(key: &str) -> Result<Self, ClientError> {
        key.trim()
            .parse()
            .map_err(|_| ClientError::UnknownSource(key.to_string()))
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Nagarik => "nagarik",
            Self::Onlinekhabar => "onlinekhabar",
            Self::Ekantipur => "ekantipur",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Nagarik => "Nagarik News",
            Self::Onlinekhabar => "OnlineKhabar",
            Self::Ekantipur => "Ekantipur",
        }
    }

    pub fn scraper_key(&self) -> ScraperKey {
        ScraperKey::for_source(self.key())
    }
}

/// Backend route segment that triggers a scrape job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ScraperKey {
    #[display("nagarikscraper")]
    Nagarik,
    #[display("onlinekhabarscraper")]
    Onlinekhabar,
    #[display("ekanscraper")]
    Ekantipur,
}

impl ScraperKey {
    /// Unrecognized keys fall back to the Ekantipur scraper rather than failing.
    pub fn for_source(key: &str) -> Self {
        match key {
            "nagarik" => Self::Nagarik,
            "onlinekhabar" => Self::Onlinekhabar,
            "ekantipur" => Self::Ekantipur,
            _ => Self::Ekantipur,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nagarik => "nagarikscraper",
            Self::Onlinekhabar => "onlinekhabarscraper",
            Self::Ekantipur => "ekanscraper",
        }
    }
}
