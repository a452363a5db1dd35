//! The rendered document: one section per news source.
//!
//! A [`Page`] is what the reconcile cycle merges into and what [`crate::ui`]
//! draws.  It mirrors the markup contract of the site's headline page:
//!
//! ```text
//! Page
//! └── Section (id = source id)
//!     └── NewsList            (may be absent)
//!         ├── Item(NewsItem)  (link identity, read/unread state)
//!         └── EmptyState      (placeholder until the first article arrives)
//! ```

use crate::source::Article;

/// Shown in a list before any article has arrived for its source.
pub const EMPTY_STATE_MESSAGE: &str = "No news available right now.";

/// Static description of one news source.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SourceSpec {
    /// Payload key and section id.
    pub id: String,
    /// Tab label.
    pub title: String,
    /// Items from this source carry read/unread state.
    pub read_tracking: bool,
    /// Links from this source are rewritten to the detail view.
    pub detail_links: bool,
}

impl SourceSpec {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            read_tracking: false,
            detail_links: false,
        }
    }

    /// Enable read tracking and detail-view links.
    pub fn internal(mut self) -> Self {
        self.read_tracking = true;
        self.detail_links = true;
        self
    }

    /// The sources the site publishes.
    pub fn defaults() -> Vec<SourceSpec> {
        vec![
            SourceSpec::new("onlinekhabar", "OnlineKhabar").internal(),
            SourceSpec::new("ronb", "Routine of Nepal Banda"),
            SourceSpec::new("hp", "Hamro Patro"),
        ]
    }
}

/// Visual read state of a list item.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ItemState {
    /// Not read-trackable.
    Plain,
    Unread,
    Read,
}

/// One rendered headline.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewsItem {
    /// The original article link, when the item was rendered with one.
    pub article_url: Option<String>,
    /// Where activating the item leads (detail view or the article itself).
    pub href: String,
    pub title: String,
    pub time: String,
    pub supports_read_state: bool,
    pub state: ItemState,
}

impl NewsItem {
    /// Build the item for a freshly arrived article.
    ///
    /// Read-trackable items start out unread; the next read-state pass
    /// corrects that for links already in the read set.
    pub fn from_article(article: &Article, href: String, read_tracking: bool) -> Self {
        Self {
            article_url: Some(article.link.clone()),
            href,
            title: article.title.clone(),
            time: article.time.clone(),
            supports_read_state: read_tracking,
            state: if read_tracking {
                ItemState::Unread
            } else {
                ItemState::Plain
            },
        }
    }

    /// A server-rendered item that only knows its href.
    #[cfg(test)]
    pub fn legacy(href: &str, title: &str) -> Self {
        Self {
            article_url: None,
            href: href.to_string(),
            title: title.to_string(),
            time: String::new(),
            supports_read_state: false,
            state: ItemState::Plain,
        }
    }

    /// The link identifying this item: its article URL, else its href.
    pub fn link(&self) -> Option<&str> {
        self.article_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| Some(self.href.as_str()).filter(|href| !href.is_empty()))
    }

    pub fn is_unread(&self) -> bool {
        self.state == ItemState::Unread
    }
}

/// A node inside a news list.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ListNode {
    Item(NewsItem),
    EmptyState(String),
}

/// The ordered list of a section, top first.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NewsList {
    pub nodes: Vec<ListNode>,
}

impl NewsList {
    /// A list holding only the empty-state placeholder.
    pub fn placeholder() -> Self {
        Self {
            nodes: vec![ListNode::EmptyState(EMPTY_STATE_MESSAGE.to_string())],
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &NewsItem> {
        self.nodes.iter().filter_map(|node| match node {
            ListNode::Item(item) => Some(item),
            ListNode::EmptyState(_) => None,
        })
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut NewsItem> {
        self.nodes.iter_mut().filter_map(|node| match node {
            ListNode::Item(item) => Some(item),
            ListNode::EmptyState(_) => None,
        })
    }

    /// Drop every empty-state placeholder.
    pub fn remove_empty_states(&mut self) {
        self.nodes.retain(|node| matches!(node, ListNode::Item(_)));
    }

    /// Insert `item` above everything else.
    pub fn prepend(&mut self, item: NewsItem) {
        self.nodes.insert(0, ListNode::Item(item));
    }
}

/// A source's section of the page.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// `None` when the section was rendered without a list.
    pub list: Option<NewsList>,
}

impl Section {
    pub fn new(id: &str, title: &str, list: Option<NewsList>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            list,
        }
    }
}

/// The whole document.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Page {
    pub sections: Vec<Section>,
}

impl Page {
    /// One placeholder-filled section per source, in order.
    pub fn for_sources(sources: &[SourceSpec]) -> Self {
        Self {
            sections: sources
                .iter()
                .map(|spec| Section::new(&spec.id, &spec.title, Some(NewsList::placeholder())))
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|section| section.id == id)
    }

    /// Every item on the page, in document order.
    pub fn items(&self) -> impl Iterator<Item = &NewsItem> {
        self.sections
            .iter()
            .filter_map(|section| section.list.as_ref())
            .flat_map(NewsList::items)
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut NewsItem> {
        self.sections
            .iter_mut()
            .filter_map(|section| section.list.as_mut())
            .flat_map(NewsList::items_mut)
    }

    /// Every item identity on the page, in document order, first occurrence
    /// only.
    pub fn links(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.items()
            .filter_map(NewsItem::link)
            .filter(|link| seen.insert(*link))
            .map(str::to_string)
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    pub fn unread_count(&self) -> usize {
        self.items().filter(|item| item.is_unread()).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn article(link: &str) -> Article {
        Article {
            link: link.to_string(),
            title: format!("title of {link}"),
            time: "1 hour ago".to_string(),
        }
    }

    #[test]
    fn for_sources_builds_placeholder_sections() {
        let page = Page::for_sources(&SourceSpec::defaults());

        assert_eq!(page.sections.len(), 3);
        assert_eq!(page.sections[0].id, "onlinekhabar");
        let list = page.section("hp").unwrap().list.as_ref().unwrap();
        assert_eq!(list.nodes, vec![ListNode::EmptyState(EMPTY_STATE_MESSAGE.into())]);
        assert_eq!(page.item_count(), 0);
    }

    #[test]
    fn default_sources_track_reads_only_for_onlinekhabar() {
        let tracked: Vec<_> = SourceSpec::defaults()
            .into_iter()
            .filter(|spec| spec.read_tracking)
            .map(|spec| spec.id)
            .collect();
        assert_eq!(tracked, vec!["onlinekhabar"]);
    }

    #[test]
    fn item_link_prefers_article_url_then_href() {
        let fresh = NewsItem::from_article(&article("https://a"), "/detail?url=a".into(), true);
        assert_eq!(fresh.link(), Some("https://a"));

        let legacy = NewsItem::legacy("https://legacy", "Old");
        assert_eq!(legacy.link(), Some("https://legacy"));

        let nothing = NewsItem::legacy("", "Broken");
        assert_eq!(nothing.link(), None);
    }

    #[test]
    fn from_article_sets_initial_state() {
        assert_eq!(
            NewsItem::from_article(&article("a"), "a".into(), true).state,
            ItemState::Unread
        );
        assert_eq!(
            NewsItem::from_article(&article("a"), "a".into(), false).state,
            ItemState::Plain
        );
    }

    #[test]
    fn prepend_puts_item_on_top_and_placeholders_go() {
        let mut list = NewsList::placeholder();
        list.prepend(NewsItem::legacy("one", "One"));
        list.prepend(NewsItem::legacy("two", "Two"));
        assert_eq!(list.nodes.len(), 3);

        list.remove_empty_states();
        let hrefs: Vec<_> = list.items().map(|item| item.href.as_str()).collect();
        assert_eq!(hrefs, vec!["two", "one"]);
    }

    #[test]
    fn links_are_deduplicated_in_document_order() {
        let mut page = Page::for_sources(&SourceSpec::defaults());
        page.section_mut("ronb").unwrap().list.as_mut().unwrap().prepend(NewsItem::legacy("x", "X"));
        page.section_mut("hp").unwrap().list.as_mut().unwrap().prepend(NewsItem::legacy("y", "Y"));
        page.section_mut("hp").unwrap().list.as_mut().unwrap().prepend(NewsItem::legacy("x", "X again"));

        assert_eq!(page.links(), vec!["x", "y"]);
        assert_eq!(page.item_count(), 3);
    }

    #[test]
    fn sections_without_lists_contribute_nothing() {
        let page = Page {
            sections: vec![Section::new("ronb", "RONB", None)],
        };
        assert!(page.links().is_empty());
    }
}
