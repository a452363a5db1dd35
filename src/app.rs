use std::time::Instant;

use ratatui::widgets::ListState;

use crate::notify::{self, Chime, Toasts};
use crate::page::{ListNode, NewsItem, Page};
use crate::poll::PollMsg;
use crate::storage::{FileStorage, Storage};
use crate::updater::LiveFeedUpdater;

pub struct App<S: Storage = FileStorage> {
    /// The rendered document.
    pub page: Page,
    pub updater: LiveFeedUpdater<S>,
    /// Index of the section whose tab is showing.
    pub active_tab: usize,
    /// One selection per section.
    pub list_states: Vec<ListState>,
    pub toasts: Toasts,
    chime: Option<Box<dyn Chime>>,
    /// A link the user asked to open, waiting for the main loop.
    pending_open: Option<String>,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last poll status message.
    pub status: String,
}

impl<S: Storage> App<S> {
    pub fn new(mut page: Page, mut updater: LiveFeedUpdater<S>, chime: Option<Box<dyn Chime>>) -> Self {
        updater.on_page_loaded(&mut page);
        let list_states = page.sections.iter().map(|_| ListState::default()).collect();

        Self {
            page,
            updater,
            active_tab: 0,
            list_states,
            toasts: Toasts::default(),
            chime,
            pending_open: None,
            quit: false,
            status: "Starting…".into(),
        }
    }

    // -- polling -------------------------------------------------------------

    /// Fold one poller message into the page.
    pub fn handle_poll(&mut self, msg: PollMsg, now: Instant) {
        let selected = self.selected_links();

        let fetched = match msg {
            PollMsg::Payload(payload) => {
                self.status = format!(
                    "Updated {} ({} headlines)",
                    chrono::Local::now().format("%H:%M:%S"),
                    payload.len()
                );
                Ok(payload)
            }
            PollMsg::Error(e) => {
                self.status = format!("Error: {e}");
                Err(anyhow::anyhow!(e))
            }
        };

        let new_articles = self.updater.complete_cycle(&mut self.page, fetched);
        self.restore_selection(selected);

        notify::announce(
            new_articles,
            self.chime.as_mut().map(|chime| chime.as_mut() as &mut dyn Chime),
            &mut self.toasts,
            now,
        );
    }

    /// Selected link per section, so it can follow its item when new
    /// articles push it down.
    fn selected_links(&self) -> Vec<Option<String>> {
        self.page
            .sections
            .iter()
            .zip(&self.list_states)
            .map(|(section, state)| {
                let list = section.list.as_ref()?;
                match list.nodes.get(state.selected()?)? {
                    ListNode::Item(item) => item.link().map(str::to_string),
                    ListNode::EmptyState(_) => None,
                }
            })
            .collect()
    }

    fn restore_selection(&mut self, selected: Vec<Option<String>>) {
        for ((section, state), link) in self
            .page
            .sections
            .iter()
            .zip(self.list_states.iter_mut())
            .zip(selected)
        {
            let (Some(list), Some(link)) = (section.list.as_ref(), link) else {
                continue;
            };
            let position = list.nodes.iter().position(|node| match node {
                ListNode::Item(item) => item.link() == Some(link.as_str()),
                ListNode::EmptyState(_) => false,
            });
            if position.is_some() {
                state.select(position);
            }
        }
    }

    // -- tabs ----------------------------------------------------------------

    pub fn next_tab(&mut self) {
        if !self.page.sections.is_empty() {
            self.active_tab = (self.active_tab + 1) % self.page.sections.len();
        }
    }

    pub fn previous_tab(&mut self) {
        let count = self.page.sections.len();
        if count > 0 {
            self.active_tab = (self.active_tab + count - 1) % count;
        }
    }

    /// Jump to the tab at `index`, ignoring out-of-range requests.
    pub fn select_tab(&mut self, index: usize) {
        if index < self.page.sections.len() {
            self.active_tab = index;
        }
    }

    // -- navigation ----------------------------------------------------------

    fn active_len(&self) -> usize {
        self.page
            .sections
            .get(self.active_tab)
            .and_then(|section| section.list.as_ref())
            .map_or(0, |list| list.nodes.len())
    }

    fn active_state(&mut self) -> Option<&mut ListState> {
        self.list_states.get_mut(self.active_tab)
    }

    pub fn select_next(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        if let Some(state) = self.active_state() {
            let i = match state.selected() {
                Some(i) => (i + 1).min(len - 1),
                None => 0,
            };
            state.select(Some(i));
        }
    }

    pub fn select_previous(&mut self) {
        if self.active_len() == 0 {
            return;
        }
        if let Some(state) = self.active_state() {
            let i = match state.selected() {
                Some(i) => i.saturating_sub(1),
                None => 0,
            };
            state.select(Some(i));
        }
    }

    pub fn select_first(&mut self) {
        if self.active_len() > 0 {
            if let Some(state) = self.active_state() {
                state.select(Some(0));
            }
        }
    }

    pub fn select_last(&mut self) {
        let len = self.active_len();
        if len > 0 {
            if let Some(state) = self.active_state() {
                state.select(Some(len - 1));
            }
        }
    }

    // -- items ---------------------------------------------------------------

    pub fn selected_item(&self) -> Option<&NewsItem> {
        let index = self.list_states.get(self.active_tab)?.selected()?;
        let list = self.page.sections.get(self.active_tab)?.list.as_ref()?;
        match list.nodes.get(index)? {
            ListNode::Item(item) => Some(item),
            ListNode::EmptyState(_) => None,
        }
    }

    /// Mark the selected item read (no-op for untracked sources).
    pub fn mark_selected_read(&mut self) {
        let Some(index) = self
            .list_states
            .get(self.active_tab)
            .and_then(ListState::selected)
        else {
            return;
        };
        let Some(ListNode::Item(item)) = self
            .page
            .sections
            .get_mut(self.active_tab)
            .and_then(|section| section.list.as_mut())
            .and_then(|list| list.nodes.get_mut(index))
        else {
            return;
        };

        self.updater.mark_as_read(item);
    }

    /// Queue the selected item's link for opening and mark it read.
    pub fn open_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let target = match self.updater.origin().join(&item.href) {
            Ok(url) => url.to_string(),
            Err(_) => item.href.clone(),
        };

        self.pending_open = Some(target);
        self.mark_selected_read();
    }

    /// The link waiting to be opened, if any.
    pub fn take_pending_open(&mut self) -> Option<String> {
        self.pending_open.take()
    }

    /// Drop toasts that have finished their animation.
    pub fn tick(&mut self, now: Instant) {
        self.toasts.prune(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ItemState, SourceSpec};
    use crate::source::FeedPayload;
    use crate::storage::{self, MemoryStorage, READ_ARTICLES_KEY};
    use url::Url;

    fn make_app() -> App<MemoryStorage> {
        let sources = SourceSpec::defaults();
        let page = Page::for_sources(&sources);
        let updater = LiveFeedUpdater::new(
            sources,
            "/news-detail/",
            Url::parse("http://news.local/").unwrap(),
            MemoryStorage::new(),
        );
        App::new(page, updater, None)
    }

    fn payload(json: &str) -> PollMsg {
        PollMsg::Payload(FeedPayload::from_json(json).unwrap())
    }

    fn ok_payload(links: &[&str]) -> PollMsg {
        let records: Vec<String> = links
            .iter()
            .map(|l| format!(r#"{{"link": "{l}", "title": "T {l}", "time": "now"}}"#))
            .collect();
        payload(&format!(r#"{{"onlinekhabar": [{}]}}"#, records.join(",")))
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn new_app_starts_with_placeholders() {
        let app = make_app();
        assert_eq!(app.page.item_count(), 0);
        assert_eq!(app.list_states.len(), 3);
        assert!(!app.quit);
        assert!(app.selected_item().is_none());
    }

    // -- polling -------------------------------------------------------------

    #[test]
    fn first_payload_is_silent_later_ones_toast() {
        let mut app = make_app();
        let now = Instant::now();

        app.handle_poll(ok_payload(&["a", "b"]), now);
        assert_eq!(app.page.item_count(), 2);
        assert!(app.toasts.is_empty());

        app.handle_poll(ok_payload(&["a", "b", "c"]), now);
        assert_eq!(
            app.toasts.iter().next().unwrap().message,
            "1 new article available!"
        );
    }

    #[test]
    fn poll_error_sets_status_and_keeps_items() {
        let mut app = make_app();
        app.handle_poll(ok_payload(&["a"]), Instant::now());

        app.handle_poll(PollMsg::Error("endpoint: HTTP 500".into()), Instant::now());

        assert_eq!(app.status, "Error: endpoint: HTTP 500");
        assert_eq!(app.page.item_count(), 1);
    }

    #[test]
    fn selection_follows_item_when_new_articles_arrive() {
        let mut app = make_app();
        app.handle_poll(ok_payload(&["a", "b"]), Instant::now());
        app.select_last();
        assert_eq!(app.selected_item().unwrap().link(), Some("a"));

        app.handle_poll(ok_payload(&["c"]), Instant::now());

        assert_eq!(app.selected_item().unwrap().link(), Some("a"));
    }

    // -- tabs ----------------------------------------------------------------

    #[test]
    fn tabs_wrap_around() {
        let mut app = make_app();
        app.previous_tab();
        assert_eq!(app.active_tab, 2);
        app.next_tab();
        assert_eq!(app.active_tab, 0);
        app.select_tab(1);
        assert_eq!(app.active_tab, 1);
        app.select_tab(9);
        assert_eq!(app.active_tab, 1, "out of range is ignored");
    }

    // -- navigation ----------------------------------------------------------

    #[test]
    fn select_next_clamps_at_last_node() {
        let mut app = make_app();
        app.handle_poll(ok_payload(&["a", "b", "c"]), Instant::now());

        app.select_next();
        assert_eq!(app.list_states[0].selected(), Some(0));
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.list_states[0].selected(), Some(2));
    }

    #[test]
    fn select_previous_clamps_at_zero() {
        let mut app = make_app();
        app.handle_poll(ok_payload(&["a", "b"]), Instant::now());

        app.select_first();
        app.select_previous();
        assert_eq!(app.list_states[0].selected(), Some(0));
    }

    #[test]
    fn selection_is_per_tab() {
        let mut app = make_app();
        app.handle_poll(ok_payload(&["a", "b"]), Instant::now());
        app.select_last();
        app.next_tab();
        app.select_first();

        assert_eq!(app.list_states[0].selected(), Some(1));
        assert_eq!(app.list_states[1].selected(), Some(0));
    }

    #[test]
    fn empty_state_is_not_an_item() {
        let mut app = make_app();
        app.select_first();
        assert_eq!(app.list_states[0].selected(), Some(0));
        assert!(app.selected_item().is_none());
    }

    // -- reading -------------------------------------------------------------

    #[test]
    fn open_selected_queues_detail_link_and_marks_read() {
        let mut app = make_app();
        app.handle_poll(ok_payload(&["https://ok.com/1"]), Instant::now());
        app.select_first();

        app.open_selected();

        assert_eq!(
            app.take_pending_open().as_deref(),
            Some("http://news.local/news-detail/?url=https%3A%2F%2Fok.com%2F1")
        );
        assert!(app.take_pending_open().is_none());
        assert_eq!(app.selected_item().unwrap().state, ItemState::Read);
        assert_eq!(
            storage::read_links(app.updater.storage(), READ_ARTICLES_KEY),
            vec!["https://ok.com/1"]
        );
    }

    #[test]
    fn read_state_survives_the_next_cycle() {
        let mut app = make_app();
        app.handle_poll(ok_payload(&["a", "b"]), Instant::now());
        app.select_first();
        app.mark_selected_read();

        app.handle_poll(ok_payload(&["a", "b"]), Instant::now());

        assert_eq!(app.page.unread_count(), 1);
    }

    #[test]
    fn marking_untracked_source_does_nothing() {
        let mut app = make_app();
        app.handle_poll(payload(r#"{"ronb": [{"link": "r"}]}"#), Instant::now());
        app.select_tab(1);
        app.select_first();

        app.mark_selected_read();

        assert_eq!(app.selected_item().unwrap().state, ItemState::Plain);
        assert_eq!(app.updater.storage().writes, 2, "only the seen snapshots");
    }
}
