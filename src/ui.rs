//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## Layout
//!
//! * a tab bar, one tab per news source;
//! * the active source's list, newest first;
//! * a one-line status bar;
//! * toasts floating over the top-right corner while they live.

use std::time::Instant;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs},
    Frame,
};

use crate::app::App;
use crate::notify::Toast;
use crate::page::{ItemState, ListNode, NewsItem};
use crate::storage::Storage;

const TOAST_HEIGHT: u16 = 3;

/// Draw the complete UI for one frame.
pub fn draw<S: Storage>(app: &mut App<S>, frame: &mut Frame, now: Instant) {
    let [tabs_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_tabs(app, frame, tabs_area);
    draw_news_list(app, frame, main_area);
    draw_status_bar(app, frame, status_area);
    draw_toasts(app, frame, main_area, now);
}

fn draw_tabs<S: Storage>(app: &App<S>, frame: &mut Frame, area: Rect) {
    let titles: Vec<Line> = app
        .page
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| {
            let unread = section
                .list
                .as_ref()
                .map_or(0, |list| list.items().filter(|item| item.is_unread()).count());
            let label = if unread > 0 {
                format!("{} {} ({unread})", i + 1, section.title)
            } else {
                format!("{} {}", i + 1, section.title)
            };
            Line::from(label)
        })
        .collect();

    let tabs = Tabs::new(titles)
        .block(Block::default().title(" Live News ").borders(Borders::ALL))
        .select(app.active_tab)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn news_line(item: &NewsItem) -> Line<'_> {
    let (marker, title_style) = match item.state {
        ItemState::Unread => (
            Span::styled("● ", Style::default().fg(Color::Cyan)),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        ItemState::Read => (
            Span::raw("  "),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        ),
        ItemState::Plain => (Span::raw("  "), Style::default().fg(Color::White)),
    };

    Line::from(vec![
        marker,
        Span::styled(item.title.as_str(), title_style),
        Span::raw("  "),
        Span::styled(item.time.as_str(), Style::default().fg(Color::DarkGray)),
        Span::styled(" ↗", Style::default().fg(Color::DarkGray)),
    ])
}

/// Render the active section's list.
fn draw_news_list<S: Storage>(app: &mut App<S>, frame: &mut Frame, area: Rect) {
    let Some(section) = app.page.sections.get(app.active_tab) else {
        return;
    };

    let list_items: Vec<ListItem> = section
        .list
        .iter()
        .flat_map(|list| list.nodes.iter())
        .map(|node| match node {
            ListNode::Item(item) => ListItem::new(news_line(item)),
            ListNode::EmptyState(message) => ListItem::new(Line::from(Span::styled(
                message.as_str(),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ))),
        })
        .collect();

    let list = List::new(list_items)
        .block(
            Block::default()
                .title(format!(" {} ", section.title))
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    if let Some(state) = app.list_states.get_mut(app.active_tab) {
        frame.render_stateful_widget(list, area, state);
    }
}

/// Render the bottom status bar.
fn draw_status_bar<S: Storage>(app: &App<S>, frame: &mut Frame, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} items", app.page.item_count()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} unread", app.page.unread_count()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  q: quit  ↑/↓: scroll  Tab: source  Enter: open  m: mark read"),
    ]));
    frame.render_widget(status, area);
}

/// Where `toast` sits when stacked `slot` places down from the top of
/// `area`, or `None` when it would not fit.
fn toast_area(toast: &Toast, area: Rect, slot: u16, now: Instant) -> Option<Rect> {
    let width = u16::try_from(toast.message.chars().count())
        .unwrap_or(u16::MAX)
        .saturating_add(4)
        .min(area.width);
    let y = area.y.saturating_add(1 + slot * TOAST_HEIGHT);
    if y + TOAST_HEIGHT > area.bottom() {
        return None;
    }

    let resting_x = area.right().saturating_sub(width + 1).max(area.x);
    let x = resting_x.saturating_add(toast.offset(now, width));
    let visible = width.min(area.right().saturating_sub(x));
    if visible < 3 {
        return None;
    }

    Some(Rect::new(x, y, visible, TOAST_HEIGHT))
}

fn draw_toasts<S: Storage>(app: &App<S>, frame: &mut Frame, area: Rect, now: Instant) {
    for (slot, toast) in app.toasts.iter().enumerate() {
        let Some(rect) = u16::try_from(slot)
            .ok()
            .and_then(|slot| toast_area(toast, area, slot, now))
        else {
            break;
        };

        let body = Paragraph::new(toast.message.as_str())
            .style(Style::default().fg(Color::White).bg(Color::Green))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(Clear, rect);
        frame.render_widget(body, rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use url::Url;

    use crate::page::{Page, SourceSpec};
    use crate::poll::PollMsg;
    use crate::source::FeedPayload;
    use crate::storage::MemoryStorage;
    use crate::updater::LiveFeedUpdater;

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

    fn feed(app: &mut App<MemoryStorage>, json: &str, now: Instant) {
        app.handle_poll(PollMsg::Payload(FeedPayload::from_json(json).unwrap()), now);
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn draw_does_not_panic_with_placeholders() {
        let mut app = make_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(&mut app, f, Instant::now())).unwrap();

        assert!(screen_text(&terminal).contains("No news available"));
    }

    #[test]
    fn draw_shows_items_and_counts() {
        let mut app = make_app();
        feed(
            &mut app,
            r#"{"onlinekhabar": [{"link": "a", "title": "Budget passed", "time": "1h"},
                                {"link": "b", "title": "Rain expected", "time": "2h"}]}"#,
            Instant::now(),
        );
        app.select_first();

        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| draw(&mut app, f, Instant::now())).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Budget passed"));
        assert!(text.contains("2 items"), "status bar should show item count");
        assert!(text.contains("2 unread"));
        assert!(text.contains("OnlineKhabar (2)"), "tab shows unread count");
    }

    #[test]
    fn draw_shows_visible_toast() {
        let mut app = make_app();
        let start = Instant::now();
        feed(&mut app, r#"{"hp": [{"link": "a"}]}"#, start);
        feed(&mut app, r#"{"hp": [{"link": "a"}, {"link": "b"}]}"#, start);

        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal
            .draw(|f| draw(&mut app, f, start + Duration::from_secs(1)))
            .unwrap();

        assert!(screen_text(&terminal).contains("1 new article available!"));
    }

    #[test]
    fn draw_survives_tiny_terminal() {
        let mut app = make_app();
        let start = Instant::now();
        feed(&mut app, r#"{"hp": [{"link": "a"}]}"#, start);
        feed(&mut app, r#"{"hp": [{"link": "b"}]}"#, start);

        let mut terminal = Terminal::new(TestBackend::new(12, 5)).unwrap();
        terminal.draw(|f| draw(&mut app, f, start)).unwrap();
    }

    #[test]
    fn toast_area_slides_from_the_right_edge() {
        let start = Instant::now();
        let toast = Toast::new("3 new articles available!".into(), start);
        let area = Rect::new(0, 0, 80, 20);

        let resting = toast_area(&toast, area, 0, start + Duration::from_secs(1)).unwrap();
        assert_eq!(resting.right(), 79);

        assert!(toast_area(&toast, area, 0, start).is_none(), "fully off-screen at t=0");
        let entering = toast_area(&toast, area, 0, start + Duration::from_millis(150)).unwrap();
        assert!(entering.x > resting.x);
    }
}
