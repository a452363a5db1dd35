//! The article record and the multi-source payload it arrives in.
//!
//! The endpoint answers with a JSON object mapping a source id to an array of
//! article records.  Records are loosely shaped on the wire, so each one is
//! first read as a [`RawArticle`] (every field optional) and then validated
//! into an [`Article`], which always has a link.
//!
//! ## Leniency
//!
//! Parsing is forgiving in the same places the page is:
//!
//! * a body that is valid JSON but not an object is an empty payload;
//! * a source whose value is not an array has no articles;
//! * a record without a usable `link` is dropped.
//!
//! Only a body that is not JSON at all is an error.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// A single headline, normalised from the payload.
///
/// `link` is the identity key: two articles with the same link are the same
/// article, whatever their titles say.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Article {
    /// Original article URL.  Never empty.
    pub link: String,

    /// Headline text (empty when the record had none).
    pub title: String,

    /// Display timestamp exactly as the server formatted it.
    pub time: String,
}

/// An article record as it appears on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawArticle {
    pub link: Option<String>,
    pub title: Option<String>,
    pub time: Option<String>,
}

impl TryFrom<RawArticle> for Article {
    type Error = anyhow::Error;

    fn try_from(raw: RawArticle) -> Result<Self> {
        let link = raw
            .link
            .filter(|link| !link.is_empty())
            .context("article record has no link")?;

        Ok(Article {
            link,
            title: raw.title.unwrap_or_default(),
            time: raw.time.unwrap_or_default(),
        })
    }
}

/// One poll response: source id → articles in payload order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FeedPayload {
    sources: HashMap<String, Vec<Article>>,
}

impl FeedPayload {
    /// Parse a response body.
    pub fn from_json(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body).context("response body is not valid JSON")?;
        Ok(Self::from_value(value))
    }

    /// Build a payload from an already-parsed JSON value.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// validation rules without a server.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let sources = map
            .into_iter()
            .map(|(id, records)| {
                let articles = match records {
                    Value::Array(records) => parse_records(&id, records),
                    _ => Vec::new(),
                };
                (id, articles)
            })
            .collect();

        Self { sources }
    }

    /// Articles for `source_id`; empty when the source is absent.
    pub fn articles(&self, source_id: &str) -> &[Article] {
        self.sources
            .get(source_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of valid articles across every source.
    pub fn len(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn with_source(mut self, source_id: &str, articles: Vec<Article>) -> Self {
        self.sources.insert(source_id.to_string(), articles);
        self
    }
}

fn parse_records(source_id: &str, records: Vec<Value>) -> Vec<Article> {
    records
        .into_iter()
        .filter_map(|record| {
            let article = serde_json::from_value::<RawArticle>(record)
                .map_err(anyhow::Error::from)
                .and_then(Article::try_from);
            match article {
                Ok(article) => Some(article),
                Err(e) => {
                    tracing::debug!(source = source_id, error = %e, "skipping article record");
                    None
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
