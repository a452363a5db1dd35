//! Reconciliation of fetched payloads into the [`Page`], and the seen/read
//! bookkeeping that goes with it.
//!
//! [`LiveFeedUpdater`] is built once at startup and lives as long as the
//! application.  It owns the [`Storage`] and the two pieces of state that
//! survive between cycles: the last seen-links snapshot and whether the
//! first cycle has happened yet.
//!
//! A cycle, driven by [`LiveFeedUpdater::complete_cycle`]:
//!
//! 1. merge each configured source's articles into its section
//!    ([`LiveFeedUpdater::apply_updates`]);
//! 2. snapshot every rendered link into the seen set and persist it;
//! 3. recompute read/unread state from the read set;
//! 4. report how many articles are new, unless this was the first cycle.

use std::collections::HashSet;

use anyhow::Result;
use url::Url;

use crate::page::{ItemState, NewsItem, Page, SourceSpec};
use crate::source::FeedPayload;
use crate::storage::{self, Storage, READ_ARTICLES_KEY, SEEN_NEWS_KEY};

pub struct LiveFeedUpdater<S: Storage> {
    sources: Vec<SourceSpec>,
    detail_base: Option<String>,
    origin: Url,
    storage: S,
    /// Links rendered as of the last sync.
    seen: HashSet<String>,
    initial_update: bool,
}

impl<S: Storage> LiveFeedUpdater<S> {
    /// Create the updater, loading the last seen snapshot from `storage`.
    /// [`on_page_loaded`](Self::on_page_loaded) replaces that snapshot with
    /// the links rendered at startup.
    ///
    /// An empty `detail_base` disables detail-link rewriting.
    pub fn new(sources: Vec<SourceSpec>, detail_base: &str, origin: Url, storage: S) -> Self {
        let seen = storage::read_links(&storage, SEEN_NEWS_KEY)
            .into_iter()
            .collect();
        let detail_base = Some(detail_base.to_string()).filter(|base| !base.is_empty());

        Self {
            sources,
            detail_base,
            origin,
            storage,
            seen,
            initial_update: true,
        }
    }

    pub fn sources(&self) -> &[SourceSpec] {
        &self.sources
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Startup pass over the initially rendered page.
    pub fn on_page_loaded(&mut self, page: &mut Page) {
        self.initialize_read_states(page);
        self.sync_seen_from_page(page);
    }

    /// Finish one poll cycle.
    ///
    /// Returns the number of new articles to announce; always zero for the
    /// very first cycle and for failed cycles.  A failed cycle leaves the
    /// page and the stores untouched.
    pub fn complete_cycle(&mut self, page: &mut Page, fetched: Result<FeedPayload>) -> usize {
        let first = std::mem::replace(&mut self.initial_update, false);

        let payload = match fetched {
            Ok(payload) => payload,
            Err(e) => {
                let message = format!("{e:#}");
                tracing::error!(error = %message, "live update error");
                return 0;
            }
        };

        let new_articles = self.apply_updates(page, &payload);
        self.sync_seen_from_page(page);
        self.initialize_read_states(page);

        tracing::info!(
            received = payload.len(),
            new_articles,
            first,
            "reconcile cycle complete"
        );

        if first {
            0
        } else {
            new_articles
        }
    }

    /// Merge every configured source; returns how many inserted articles
    /// were absent from the last seen snapshot.
    pub fn apply_updates(&self, page: &mut Page, payload: &FeedPayload) -> usize {
        self.sources
            .iter()
            .map(|spec| self.update_source(page, spec, payload))
            .sum()
    }

    fn update_source(&self, page: &mut Page, spec: &SourceSpec, payload: &FeedPayload) -> usize {
        let Some(list) = page
            .section_mut(&spec.id)
            .and_then(|section| section.list.as_mut())
        else {
            tracing::debug!(source = %spec.id, "no list rendered for source");
            return 0;
        };

        let articles = payload.articles(&spec.id);
        let mut existing: HashSet<String> = list
            .items()
            .filter_map(NewsItem::link)
            .map(str::to_string)
            .collect();

        if !articles.is_empty() {
            list.remove_empty_states();
        }

        let mut new_items = 0;
        for article in articles {
            if existing.contains(&article.link) {
                continue;
            }

            let href = if spec.detail_links {
                self.detail_link(&article.link)
            } else {
                article.link.clone()
            };
            list.prepend(NewsItem::from_article(article, href, spec.read_tracking));

            existing.insert(article.link.clone());
            if !self.seen.contains(&article.link) {
                new_items += 1;
            }
        }

        new_items
    }

    /// Relative detail-view URL for `link`, or `link` itself when no usable
    /// base is configured.
    pub fn detail_link(&self, link: &str) -> String {
        match &self.detail_base {
            Some(base) => detail_link(base, &self.origin, link),
            None => link.to_string(),
        }
    }

    /// Replace the seen snapshot with the links currently on the page.
    pub fn sync_seen_from_page(&mut self, page: &Page) {
        let links = page.links();
        if let Err(e) = storage::write_links(&mut self.storage, SEEN_NEWS_KEY, &links) {
            tracing::warn!(error = %e, "failed to persist seen links");
        }
        self.seen = links.into_iter().collect();
    }

    /// Set every read-trackable item to read or unread from the read set.
    pub fn initialize_read_states(&self, page: &mut Page) {
        let read: HashSet<String> = storage::read_links(&self.storage, READ_ARTICLES_KEY)
            .into_iter()
            .collect();

        for item in page.items_mut().filter(|item| item.supports_read_state) {
            let Some(link) = item.link() else {
                continue;
            };
            let is_read = read.contains(link);
            item.state = if is_read {
                ItemState::Read
            } else {
                ItemState::Unread
            };
        }
    }

    /// Mark `item` read.  Returns `true` when the read set was written.
    ///
    /// Items without read tracking are left alone.
    pub fn mark_as_read(&mut self, item: &mut NewsItem) -> bool {
        if !item.supports_read_state {
            return false;
        }
        let Some(link) = item.link().map(str::to_string) else {
            return false;
        };

        item.state = ItemState::Read;

        let mut read = storage::read_links(&self.storage, READ_ARTICLES_KEY);
        if read.contains(&link) {
            return false;
        }

        read.push(link);
        match storage::write_links(&mut self.storage, READ_ARTICLES_KEY, &read) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist read articles");
                false
            }
        }
    }

    /// Links in the seen snapshot.
    #[cfg(test)]
    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }
}

/// Build `<base path>?<query with url=link>` relative to `origin`.
///
/// An existing `url` parameter keeps its position and takes the new value;
/// later duplicates are dropped.  Without one, `url` is appended.  Falls
/// back to `link` when `base` cannot be resolved.
pub fn detail_link(base: &str, origin: &Url, link: &str) -> String {
    let mut detail = match origin.join(base) {
        Ok(detail) => detail,
        Err(e) => {
            tracing::warn!(base, error = %e, "failed to construct detail URL, falling back to article link");
            return link.to_string();
        }
    };

    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in detail.query_pairs() {
        if key != "url" {
            pairs.push((key.into_owned(), value.into_owned()));
        } else if !replaced {
            pairs.push(("url".to_string(), link.to_string()));
            replaced = true;
        }
    }
    if !replaced {
        pairs.push(("url".to_string(), link.to_string()));
    }

    detail.query_pairs_mut().clear().extend_pairs(pairs);

    match detail.query() {
        Some(query) => format!("{}?{}", detail.path(), query),
        None => detail.path().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
