// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Terminal UI.
//!
//! The dashboard is an actor: one `App` value owns all mutable state and is
//! driven by a single inbox of [`Msg`] values. Fetch tasks, timers, and the
//! terminal input reader each deliver messages into that inbox and never
//! touch state directly, so no locks guard the dashboard itself.

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::io;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::config::Config;
use crate::feeds::{self, NewsItem};
use crate::fetch::{self, FetchError};
use crate::intel::{self, cache::BriefCache, Brief};
use crate::markets::{self, Commodity, CryptoPrice, PredictionMarket};
use crate::weather::{self, Conditions, DayForecast};

pub mod styles;

#[cfg(test)]
mod tests;

/// Fixed line count of one rendered news item: meta, title, separator.
const LINES_PER_ITEM: usize = 3;
const NEWS_ITEM_CAP: usize = 200;
const LOCAL_ITEM_CAP: usize = 100;
const SELECTION_PAGE: usize = 10;
const TOAST_TTL: Duration = Duration::from_secs(4);

/// Identifies one external data source feeding one pane slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceId {
    GlobalNews,
    LocalNews,
    Crypto,
    Stocks,
    Commodities,
    PredictionMarkets,
    Weather,
    Brief,
}

impl SourceId {
    /// All sources covered by a full refresh (the brief is staleness-driven,
    /// not interval-driven).
    pub const REFRESHABLE: [SourceId; 7] = [
        SourceId::GlobalNews,
        SourceId::LocalNews,
        SourceId::Crypto,
        SourceId::Stocks,
        SourceId::Commodities,
        SourceId::PredictionMarkets,
        SourceId::Weather,
    ];
}

/// One inbox message. Every fetch task produces exactly one terminal
/// message; key presses, resizes, and ticks arrive through the same inbox.
#[derive(Debug)]
pub enum Msg {
    GlobalNews(Result<Vec<NewsItem>, String>),
    LocalNews(Result<Vec<NewsItem>, String>),
    Crypto(Result<Vec<CryptoPrice>, String>),
    Stocks(Result<Vec<markets::StockIndex>, String>),
    Commodities(Result<Vec<Commodity>, String>),
    PredictionMarkets(Result<Vec<PredictionMarket>, String>),
    Weather(Result<(Conditions, Vec<DayForecast>), String>),
    Brief {
        result: Result<Brief, String>,
        from_cache: bool,
    },
    Tick,
    Key(KeyEvent),
    Resize(u16, u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    GlobalNews,
    Local,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Overview, Tab::GlobalNews, Tab::Local];

    fn next(self) -> Tab {
        match self {
            Tab::Overview => Tab::GlobalNews,
            Tab::GlobalNews => Tab::Local,
            Tab::Local => Tab::Overview,
        }
    }

    fn prev(self) -> Tab {
        match self {
            Tab::Overview => Tab::Local,
            Tab::GlobalNews => Tab::Overview,
            Tab::Local => Tab::GlobalNews,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Tab::Overview => "1 Overview",
            Tab::GlobalNews => "2 Global News",
            Tab::Local => "3 Local",
        }
    }
}

/// Scroll state for one scrollable tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub height: usize,
    pub y_offset: usize,
    pub content_lines: usize,
}

impl Viewport {
    fn max_offset(&self) -> usize {
        self.content_lines.saturating_sub(self.height)
    }

    fn set_y_offset(&mut self, offset: usize) {
        self.y_offset = offset.min(self.max_offset());
    }

    fn goto_top(&mut self) {
        self.y_offset = 0;
    }
}

/// Keeps the selected item's 3-line span visible.
///
/// Index 0 always jumps to the absolute top so the summary header above the
/// list is revealed — a deliberate override, not a clamp. Otherwise the
/// offset moves the minimum distance that brings the whole span into view.
pub fn scroll_into_view(viewport: &mut Viewport, header_lines: usize, selected: usize) {
    if selected == 0 {
        viewport.goto_top();
        return;
    }
    if viewport.height == 0 {
        return;
    }
    let item_top = header_lines + selected * LINES_PER_ITEM;
    let item_bottom = item_top + LINES_PER_ITEM - 1;

    if item_top < viewport.y_offset {
        viewport.set_y_offset(item_top);
    } else if item_bottom >= viewport.y_offset + viewport.height {
        viewport.set_y_offset(item_bottom + 1 - viewport.height);
    }
}

/// One HTTP client per source family, each with its own bounded timeout.
#[derive(Debug, Clone)]
pub struct Clients {
    pub feeds: reqwest::Client,
    pub markets: reqwest::Client,
    pub weather: reqwest::Client,
    pub llm: reqwest::Client,
}

impl Clients {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            feeds: fetch::http_client(fetch::FEEDS_TIMEOUT)?,
            markets: fetch::http_client(fetch::MARKETS_TIMEOUT)?,
            weather: fetch::http_client(fetch::WEATHER_TIMEOUT)?,
            llm: fetch::http_client(fetch::LLM_TIMEOUT)?,
        })
    }
}

#[derive(Debug)]
struct Toast {
    message: String,
    expires_at: Instant,
}

/// Root dashboard state. Created once at startup; mutated only by
/// [`App::handle_msg`] on the event loop.
pub struct App {
    cfg: Config,
    clients: Clients,
    cache: Option<BriefCache>,
    tx: UnboundedSender<Msg>,

    width: u16,
    height: u16,
    active_tab: Tab,

    global_news: Vec<NewsItem>,
    local_news: Vec<NewsItem>,
    crypto: Vec<CryptoPrice>,
    indices: Vec<markets::StockIndex>,
    commodities: Vec<Commodity>,
    prediction_markets: Vec<PredictionMarket>,
    weather: Option<Conditions>,
    forecast: Vec<DayForecast>,
    brief: Option<Brief>,

    loading: BTreeSet<SourceId>,
    errors: BTreeMap<SourceId, String>,
    last_refresh: Option<DateTime<Local>>,

    selected_news: usize,
    news_header_lines: usize,
    selected_local: usize,
    local_header_lines: usize,
    news_view: Viewport,
    local_view: Viewport,

    news_text: Text<'static>,
    local_text: Text<'static>,
    weather_panel: Text<'static>,
    brief_panel: Text<'static>,
    markets_panel: Text<'static>,
    prediction_panel: Text<'static>,

    toast: Option<Toast>,
    should_quit: bool,
}

impl App {
    pub fn new(
        cfg: Config,
        clients: Clients,
        cache: Option<BriefCache>,
        tx: UnboundedSender<Msg>,
    ) -> Self {
        let mut app = Self {
            cfg,
            clients,
            cache,
            tx,
            width: 80,
            height: 24,
            active_tab: Tab::Overview,
            global_news: Vec::new(),
            local_news: Vec::new(),
            crypto: Vec::new(),
            indices: Vec::new(),
            commodities: Vec::new(),
            prediction_markets: Vec::new(),
            weather: None,
            forecast: Vec::new(),
            brief: None,
            loading: BTreeSet::new(),
            errors: BTreeMap::new(),
            last_refresh: None,
            selected_news: 0,
            news_header_lines: 0,
            selected_local: 0,
            local_header_lines: 0,
            news_view: Viewport::default(),
            local_view: Viewport::default(),
            news_text: Text::default(),
            local_text: Text::default(),
            weather_panel: Text::default(),
            brief_panel: Text::default(),
            markets_panel: Text::default(),
            prediction_panel: Text::default(),
            toast: None,
            should_quit: false,
        };
        app.apply_viewport_dims();
        app.rebuild_all_panes();
        app
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn is_loading(&self, id: SourceId) -> bool {
        self.loading.contains(&id)
    }

    pub fn error(&self, id: SourceId) -> Option<&str> {
        self.errors.get(&id).map(String::as_str)
    }

    /// Kicks off the startup work: cache probe first, then a full refresh
    /// and the interval timer.
    pub fn bootstrap(&mut self) {
        self.probe_brief_cache();
        self.refresh_all();
        self.schedule_tick();
    }

    // ─── Message handling ────────────────────────────────────────────────

    /// Processes one inbox message. The sole mutation point of the app.
    pub fn handle_msg(&mut self, msg: Msg) {
        match msg {
            Msg::GlobalNews(result) => self.apply_global_news(result),
            Msg::LocalNews(result) => self.apply_local_news(result),
            Msg::Crypto(result) => self.apply_crypto(result),
            Msg::Stocks(result) => self.apply_stocks(result),
            Msg::Commodities(result) => self.apply_commodities(result),
            Msg::PredictionMarkets(result) => self.apply_prediction_markets(result),
            Msg::Weather(result) => self.apply_weather(result),
            Msg::Brief { result, from_cache } => self.apply_brief(result, from_cache),
            Msg::Tick => {
                self.refresh_all();
                self.schedule_tick();
            }
            Msg::Key(key) => self.handle_key(key),
            Msg::Resize(width, height) => self.apply_resize(width, height),
        }
    }

    fn apply_global_news(&mut self, result: Result<Vec<NewsItem>, String>) {
        self.loading.remove(&SourceId::GlobalNews);
        match result {
            Ok(items) => {
                self.global_news = items;
                self.errors.remove(&SourceId::GlobalNews);
                self.selected_news = self.selected_news.min(self.global_news.len().saturating_sub(1));
                self.last_refresh = Some(Local::now());
                // Staleness-driven brief: first successful news load with no
                // brief yet triggers generation (cache consulted in-task).
                if !self.cfg.llm_api_key.is_empty()
                    && self.brief.is_none()
                    && !self.loading.contains(&SourceId::Brief)
                {
                    self.request_brief(false);
                }
            }
            Err(err) => {
                self.errors.insert(SourceId::GlobalNews, err);
            }
        }
        self.rebuild_news_pane();
    }

    fn apply_local_news(&mut self, result: Result<Vec<NewsItem>, String>) {
        self.loading.remove(&SourceId::LocalNews);
        match result {
            Ok(items) => {
                self.local_news = items;
                self.errors.remove(&SourceId::LocalNews);
                self.selected_local = self.selected_local.min(self.local_news.len().saturating_sub(1));
                self.last_refresh = Some(Local::now());
            }
            Err(err) => {
                self.errors.insert(SourceId::LocalNews, err);
            }
        }
        self.rebuild_local_pane();
    }

    fn apply_crypto(&mut self, result: Result<Vec<CryptoPrice>, String>) {
        self.loading.remove(&SourceId::Crypto);
        match result {
            Ok(prices) => {
                self.crypto = prices;
                self.errors.remove(&SourceId::Crypto);
                self.last_refresh = Some(Local::now());
            }
            Err(err) => {
                self.errors.insert(SourceId::Crypto, err);
            }
        }
        self.rebuild_markets_panel();
    }

    fn apply_stocks(&mut self, result: Result<Vec<markets::StockIndex>, String>) {
        self.loading.remove(&SourceId::Stocks);
        match result {
            Ok(indices) => {
                self.indices = indices;
                self.errors.remove(&SourceId::Stocks);
                self.last_refresh = Some(Local::now());
            }
            Err(err) => {
                self.errors.insert(SourceId::Stocks, err);
            }
        }
        self.rebuild_markets_panel();
    }

    fn apply_commodities(&mut self, result: Result<Vec<Commodity>, String>) {
        self.loading.remove(&SourceId::Commodities);
        match result {
            Ok(commodities) => {
                self.commodities = commodities;
                self.errors.remove(&SourceId::Commodities);
                self.last_refresh = Some(Local::now());
            }
            Err(err) => {
                self.errors.insert(SourceId::Commodities, err);
            }
        }
        self.rebuild_markets_panel();
    }

    fn apply_prediction_markets(&mut self, result: Result<Vec<PredictionMarket>, String>) {
        self.loading.remove(&SourceId::PredictionMarkets);
        match result {
            Ok(mkts) => {
                self.prediction_markets = mkts;
                self.errors.remove(&SourceId::PredictionMarkets);
                self.last_refresh = Some(Local::now());
            }
            Err(err) => {
                self.errors.insert(SourceId::PredictionMarkets, err);
            }
        }
        self.rebuild_prediction_panel();
    }

    fn apply_weather(&mut self, result: Result<(Conditions, Vec<DayForecast>), String>) {
        self.loading.remove(&SourceId::Weather);
        match result {
            Ok((conditions, forecast)) => {
                self.weather = Some(conditions);
                self.forecast = forecast;
                self.errors.remove(&SourceId::Weather);
                self.last_refresh = Some(Local::now());
            }
            Err(err) => {
                self.errors.insert(SourceId::Weather, err);
            }
        }
        // Weather feeds both the local-tab header and the overview quadrant.
        self.rebuild_weather_panel();
        self.rebuild_local_pane();
    }

    fn apply_brief(&mut self, result: Result<Brief, String>, from_cache: bool) {
        self.loading.remove(&SourceId::Brief);
        match result {
            Ok(brief) => {
                self.errors.remove(&SourceId::Brief);
                self.last_refresh = Some(Local::now());
                if from_cache {
                    let stamp = brief
                        .generated_at
                        .with_timezone(&Local)
                        .format("%b %d %H:%M");
                    self.set_toast(format!("Brief loaded from cache ({stamp})"));
                } else {
                    self.set_toast("Brief generated and cached");
                }
                self.brief = Some(brief);
            }
            Err(err) => {
                self.errors.insert(SourceId::Brief, err);
            }
        }
        // Brief arrival also invalidates the news pane's risk header.
        self.rebuild_brief_panel();
        self.rebuild_news_pane();
    }

    fn apply_resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.apply_viewport_dims();
        self.rebuild_all_panes();
    }

    fn apply_viewport_dims(&mut self) {
        // header + tabs + footer + pane borders
        let content_h = usize::from(self.height.saturating_sub(5)).max(5);
        self.news_view.height = content_h;
        self.local_view.height = content_h;
    }

    // ─── Orchestration ───────────────────────────────────────────────────

    /// Fans out one independent fetch task per refreshable source. Each
    /// task sends exactly one message; a failure in one source never
    /// delays or cancels another.
    pub fn refresh_all(&mut self) {
        for id in SourceId::REFRESHABLE {
            self.loading.insert(id);
        }

        let tx = self.tx.clone();
        let client = self.clients.feeds.clone();
        tokio::spawn(async move {
            let result = feeds::fetch_global_news(&client)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(Msg::GlobalNews(result));
        });

        let tx = self.tx.clone();
        let client = self.clients.feeds.clone();
        let city = self.cfg.location.city.clone();
        let country = self.cfg.location.country.clone();
        tokio::spawn(async move {
            let result = feeds::fetch_local_news(&client, &city, &country)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(Msg::LocalNews(result));
        });

        let tx = self.tx.clone();
        let client = self.clients.markets.clone();
        let ids = self.cfg.crypto_ids.clone();
        tokio::spawn(async move {
            let result = markets::fetch_crypto_prices(&client, &ids)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(Msg::Crypto(result));
        });

        let tx = self.tx.clone();
        let client = self.clients.markets.clone();
        tokio::spawn(async move {
            let result = markets::fetch_stock_indices(&client)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(Msg::Stocks(result));
        });

        let tx = self.tx.clone();
        let client = self.clients.markets.clone();
        tokio::spawn(async move {
            let result = markets::fetch_commodities(&client)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(Msg::Commodities(result));
        });

        let tx = self.tx.clone();
        let client = self.clients.markets.clone();
        tokio::spawn(async move {
            let result = markets::fetch_prediction_markets(&client)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(Msg::PredictionMarkets(result));
        });

        let tx = self.tx.clone();
        let client = self.clients.weather.clone();
        let location = self.cfg.location.clone();
        tokio::spawn(async move {
            let result = weather::fetch(&client, location.latitude, location.longitude, &location.city)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(Msg::Weather(result));
        });

        self.rebuild_all_panes();
    }

    /// Arms the interval timer for one tick. Re-armed after each tick, so a
    /// manual refresh never accelerates the schedule.
    fn schedule_tick(&self) {
        let tx = self.tx.clone();
        let secs = self.cfg.refresh_secs.max(1);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            let _ = tx.send(Msg::Tick);
        });
    }

    /// On startup, try the disk cache before any network call.
    fn probe_brief_cache(&self) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let mins = self.cfg.brief_cache_mins;
        if mins == 0 {
            return;
        }
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Some(brief) = cache.load(mins) {
                let _ = tx.send(Msg::Brief {
                    result: Ok(brief),
                    from_cache: true,
                });
            }
        });
    }

    /// Requests brief generation. The task consults the cache first unless
    /// `force` is set; a fresh synthesis result is persisted best-effort
    /// before its message is delivered.
    pub fn request_brief(&mut self, force: bool) {
        if self.cfg.llm_api_key.is_empty() {
            return;
        }
        self.loading.insert(SourceId::Brief);

        let tx = self.tx.clone();
        let client = self.clients.llm.clone();
        let cache = self.cache.clone();
        let cache_mins = self.cfg.brief_cache_mins;
        let api_key = self.cfg.llm_api_key.clone();
        let model = self.cfg.llm_model.clone();
        let items = self.global_news.clone();
        tokio::spawn(async move {
            if !force && cache_mins > 0 {
                if let Some(brief) = cache.as_ref().and_then(|c| c.load(cache_mins)) {
                    let _ = tx.send(Msg::Brief {
                        result: Ok(brief),
                        from_cache: true,
                    });
                    return;
                }
            }
            let result = intel::generate_brief(&client, &api_key, &model, &items)
                .await
                .map_err(|err| err.to_string());
            if let (Ok(brief), Some(cache)) = (&result, &cache) {
                cache.save(brief);
            }
            let _ = tx.send(Msg::Brief {
                result,
                from_cache: false,
            });
        });

        self.rebuild_brief_panel();
        self.rebuild_news_pane();
    }

    // ─── Key handling ────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
                self.active_tab = self.active_tab.next();
            }
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                self.active_tab = self.active_tab.prev();
            }
            KeyCode::Char('1') => self.active_tab = Tab::Overview,
            KeyCode::Char('2') => self.active_tab = Tab::GlobalNews,
            KeyCode::Char('3') => self.active_tab = Tab::Local,
            KeyCode::Char('r') => {
                self.last_refresh = None;
                self.refresh_all();
            }
            KeyCode::Char('b') => {
                if self.cfg.llm_api_key.is_empty() {
                    self.set_toast("No LLM API key configured");
                } else {
                    self.request_brief(false);
                }
            }
            KeyCode::Char('B') => {
                if self.cfg.llm_api_key.is_empty() {
                    self.set_toast("No LLM API key configured");
                } else {
                    self.set_toast("Forcing fresh brief (ignoring cache)...");
                    self.request_brief(true);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('d') => self.move_selection(SELECTION_PAGE as i64),
            KeyCode::Char('u') => self.move_selection(-(SELECTION_PAGE as i64)),
            KeyCode::Char('g') => self.selection_to_top(),
            KeyCode::Char('G') => self.selection_to_bottom(),
            KeyCode::Enter => self.open_selected(),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: i64) {
        match self.active_tab {
            Tab::GlobalNews => {
                if self.global_news.is_empty() {
                    return;
                }
                let max = self.global_news.len().min(NEWS_ITEM_CAP) - 1;
                self.selected_news = step_index(self.selected_news, delta, max);
                self.rebuild_news_pane();
            }
            Tab::Local => {
                if self.local_news.is_empty() {
                    return;
                }
                let max = self.local_news.len().min(LOCAL_ITEM_CAP) - 1;
                self.selected_local = step_index(self.selected_local, delta, max);
                self.rebuild_local_pane();
            }
            Tab::Overview => {}
        }
    }

    fn selection_to_top(&mut self) {
        match self.active_tab {
            Tab::GlobalNews => {
                self.selected_news = 0;
                self.rebuild_news_pane();
            }
            Tab::Local => {
                self.selected_local = 0;
                self.rebuild_local_pane();
            }
            Tab::Overview => {}
        }
    }

    fn selection_to_bottom(&mut self) {
        match self.active_tab {
            Tab::GlobalNews => {
                if self.global_news.is_empty() {
                    return;
                }
                self.selected_news = self.global_news.len().min(NEWS_ITEM_CAP) - 1;
                self.rebuild_news_pane();
            }
            Tab::Local => {
                if self.local_news.is_empty() {
                    return;
                }
                self.selected_local = self.local_news.len().min(LOCAL_ITEM_CAP) - 1;
                self.rebuild_local_pane();
            }
            Tab::Overview => {}
        }
    }

    fn open_selected(&mut self) {
        let item = match self.active_tab {
            Tab::GlobalNews => self.global_news.get(self.selected_news),
            Tab::Local => self.local_news.get(self.selected_local),
            Tab::Overview => None,
        };
        let Some(item) = item else {
            return;
        };
        if item.url.is_empty() {
            self.set_toast("No URL available for this article");
            return;
        }
        open_in_browser(&item.url);
        let title = truncate_chars(&item.title, 60);
        self.set_toast(format!("Opening: {title}"));
    }

    fn set_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            expires_at: Instant::now() + TOAST_TTL,
        });
    }

    fn active_toast(&self) -> Option<&str> {
        self.toast
            .as_ref()
            .filter(|toast| toast.expires_at > Instant::now())
            .map(|toast| toast.message.as_str())
    }

    // ─── Pane regeneration ───────────────────────────────────────────────

    fn rebuild_all_panes(&mut self) {
        self.rebuild_news_pane();
        self.rebuild_local_pane();
        self.rebuild_weather_panel();
        self.rebuild_brief_panel();
        self.rebuild_markets_panel();
        self.rebuild_prediction_panel();
    }

    fn text_width(&self) -> usize {
        usize::from(self.width.saturating_sub(4)).max(20)
    }

    fn rebuild_news_pane(&mut self) {
        let inner_w = self.text_width();
        let mut lines: Vec<Line<'static>> = Vec::new();

        if let Some(err) = self.errors.get(&SourceId::GlobalNews) {
            lines.push(Line::styled(format!("⚠ Error: {err}"), styles::ERROR));
            lines.push(Line::default());
        }
        if self.global_news.is_empty() {
            let msg = if self.loading.contains(&SourceId::GlobalNews) {
                "  Fetching global news..."
            } else {
                "  No news loaded. Press r to refresh."
            };
            lines.push(Line::raw(msg));
            self.news_header_lines = 0;
            self.set_news_text(Text::from(lines));
            return;
        }

        lines.extend(risk_panel_lines(
            self.brief.as_ref(),
            self.loading.contains(&SourceId::Brief),
            inner_w,
        ));
        lines.push(Line::styled("─".repeat(inner_w.min(120)), styles::DIVIDER));
        lines.push(Line::default());
        lines.push(Line::styled(
            format!(
                " ARTICLES  ({})  ·  j/k navigate  ·  enter to open in browser",
                self.global_news.len()
            ),
            styles::SECTION_HEADER,
        ));
        lines.push(Line::default());

        self.news_header_lines = lines.len();
        push_news_items(
            &mut lines,
            &self.global_news,
            NEWS_ITEM_CAP,
            self.selected_news,
            inner_w,
            true,
        );
        self.set_news_text(Text::from(lines));
    }

    fn set_news_text(&mut self, text: Text<'static>) {
        self.news_view.content_lines = text.lines.len();
        self.news_text = text;
        self.news_view.set_y_offset(self.news_view.y_offset);
        scroll_into_view(&mut self.news_view, self.news_header_lines, self.selected_news);
    }

    fn rebuild_local_pane(&mut self) {
        let inner_w = self.text_width();
        let mut lines: Vec<Line<'static>> = Vec::new();

        match (&self.weather, self.errors.get(&SourceId::Weather)) {
            (Some(conditions), _) => {
                lines.push(Line::styled(
                    format!(" WEATHER  {}", conditions.city),
                    styles::SECTION_HEADER,
                ));
                lines.push(Line::default());
                lines.push(Line::raw(format!(
                    "  {}  {}  {:.1}°C  (feels like {:.1}°C)",
                    conditions.icon,
                    conditions.description,
                    conditions.temp_c,
                    conditions.feels_like_c
                )));
                lines.push(Line::raw(format!(
                    "  💧 Humidity: {}%   💨 Wind: {:.0} km/h {}   👁 Visibility: {:.0} km   ☀ UV: {:.0}",
                    conditions.humidity,
                    conditions.wind_speed_kmh,
                    weather::wind_direction_str(conditions.wind_direction),
                    conditions.visibility_m / 1000.0,
                    conditions.uv_index
                )));
                lines.push(Line::default());
                if !self.forecast.is_empty() {
                    lines.push(Line::styled(
                        format!(
                            "  {:<12} {:<16} {:>8} {:>8} {:>10}",
                            "DATE", "CONDITION", "MAX", "MIN", "RAIN"
                        ),
                        styles::TABLE_HEADER,
                    ));
                    lines.push(Line::styled("─".repeat(inner_w.min(60)), styles::DIVIDER));
                    for day in &self.forecast {
                        lines.push(Line::raw(format!(
                            "  {:<12} {} {:<12} {:>6.1}°C {:>6.1}°C {:>7.1}mm",
                            day.date.format("%a %b %d"),
                            day.icon,
                            day.description,
                            day.max_temp_c,
                            day.min_temp_c,
                            day.rain_mm
                        )));
                    }
                    lines.push(Line::default());
                }
            }
            (None, Some(_)) => {
                lines.push(Line::styled("⚠ Weather error", styles::ERROR));
            }
            (None, None) => {
                lines.push(Line::raw("  Fetching weather..."));
            }
        }

        lines.push(Line::default());
        lines.push(Line::styled(
            format!(" LOCAL NEWS  {}", self.cfg.location.city),
            styles::SECTION_HEADER,
        ));
        lines.push(Line::default());

        if let Some(err) = self.errors.get(&SourceId::LocalNews) {
            lines.push(Line::styled(format!("⚠ {err}"), styles::ERROR));
            self.local_header_lines = lines.len();
        } else if self.local_news.is_empty() {
            lines.push(Line::raw("  No local news loaded. Press r to refresh."));
            self.local_header_lines = lines.len();
        } else {
            lines.push(Line::styled(
                format!(
                    " ARTICLES  ({})  ·  j/k navigate  ·  enter to open in browser",
                    self.local_news.len()
                ),
                styles::SECTION_HEADER,
            ));
            lines.push(Line::default());
            self.local_header_lines = lines.len();
            push_news_items(
                &mut lines,
                &self.local_news,
                LOCAL_ITEM_CAP,
                self.selected_local,
                inner_w,
                false,
            );
        }

        self.local_view.content_lines = lines.len();
        self.local_text = Text::from(lines);
        self.local_view.set_y_offset(self.local_view.y_offset);
        scroll_into_view(&mut self.local_view, self.local_header_lines, self.selected_local);
    }

    // Overview quadrant geometry mirrors the drawn 2×2 layout so row caps
    // match what actually fits.
    fn overview_geometry(&self) -> (usize, usize, usize) {
        let content_h = usize::from(self.height.saturating_sub(5)).max(10);
        let top_h = (content_h * 4 / 10).max(8);
        let bot_h = content_h.saturating_sub(top_h + 1).max(8);
        let quad_w = usize::from(self.width.saturating_sub(3)) / 2;
        (top_h, bot_h, quad_w)
    }

    fn rebuild_weather_panel(&mut self) {
        let (top_h, _, quad_w) = self.overview_geometry();
        let w = quad_w.saturating_sub(2).max(10);
        let h = top_h.saturating_sub(2).max(4);
        let mut lines: Vec<Line<'static>> = Vec::new();

        if let Some(err) = self.errors.get(&SourceId::Weather) {
            self.weather_panel = Text::from(Line::styled(format!("⚠ {err}"), styles::ERROR));
            return;
        }
        let Some(conditions) = &self.weather else {
            self.weather_panel = Text::from(Line::raw(" fetching weather..."));
            return;
        };

        lines.push(Line::from(vec![
            Span::raw(format!("{}  ", conditions.icon)),
            Span::styled(format!("{:.1}°C", conditions.temp_c), styles::WEATHER_TEMP),
        ]));
        lines.push(Line::styled(conditions.description.to_owned(), styles::WEATHER_DESC));
        lines.push(Line::styled(
            format!("Feels like {:.1}°C", conditions.feels_like_c),
            styles::AGE,
        ));
        lines.push(Line::default());
        lines.push(Line::raw(format!(
            "💧 {}%   💨 {:.0} km/h {}   ☀ UV {:.0}",
            conditions.humidity,
            conditions.wind_speed_kmh,
            weather::wind_direction_str(conditions.wind_direction),
            conditions.uv_index
        )));

        if !self.forecast.is_empty() {
            lines.push(Line::default());
            lines.push(Line::styled(
                format!("{:<10}  {:<4} {:>5} {:>5} {:>5}", "Day", "", "Hi", "Lo", "Rain"),
                styles::TABLE_HEADER,
            ));
            lines.push(Line::styled("─".repeat(w.min(36)), styles::DIVIDER));
            let max_rows = h.saturating_sub(8).max(1);
            for (i, day) in self.forecast.iter().take(max_rows).enumerate() {
                let day_label = if i == 0 {
                    "Today     ".to_owned()
                } else {
                    day.date.format("%a %d %b").to_string()
                };
                lines.push(Line::raw(format!(
                    "{:<10}  {}  {:>4.0}° {:>4.0}° {:>3.0}mm",
                    day_label, day.icon, day.max_temp_c, day.min_temp_c, day.rain_mm
                )));
            }
        }

        self.weather_panel = Text::from(lines);
    }

    fn rebuild_brief_panel(&mut self) {
        let (_, _, quad_w) = self.overview_geometry();
        let w = quad_w.saturating_sub(2).max(10);
        let mut lines: Vec<Line<'static>> = Vec::new();

        if self.cfg.llm_api_key.is_empty() {
            lines.push(Line::styled("⚠  No LLM API key set.", styles::WARNING));
            lines.push(Line::default());
            for hint in [
                "Add key to:",
                "~/.config/watchtower/config.yaml",
                "",
                "Press [b] after adding key.",
            ] {
                lines.push(Line::styled(hint.to_owned(), styles::MUTED));
            }
            self.brief_panel = Text::from(lines);
            return;
        }

        if self.loading.contains(&SourceId::Brief) {
            lines.push(Line::raw(" Generating brief..."));
            lines.push(Line::default());
            lines.push(Line::styled("Calling the model...", styles::MUTED));
            self.brief_panel = Text::from(lines);
            return;
        }

        if let Some(err) = self.errors.get(&SourceId::Brief) {
            lines.push(Line::styled(format!("⚠ {err}"), styles::ERROR));
            lines.push(Line::default());
            lines.push(Line::styled("Press [b] to retry.", styles::MUTED));
            self.brief_panel = Text::from(lines);
            return;
        }

        let Some(brief) = &self.brief else {
            let hint = if self.global_news.is_empty() {
                "Waiting for news to load..."
            } else {
                "Press [b] to generate AI brief."
            };
            self.brief_panel = Text::from(Line::styled(hint, styles::MUTED));
            return;
        };

        let age = Utc::now().signed_duration_since(brief.generated_at);
        let cache_age = if age.num_minutes() >= 60 {
            format!("  cached {}h{}m ago", age.num_minutes() / 60, age.num_minutes() % 60)
        } else if age.num_minutes() >= 1 {
            format!("  cached {}m ago", age.num_minutes())
        } else {
            String::new()
        };
        lines.push(Line::styled(
            format!(
                "{}  {}{cache_age}",
                brief.generated_at.with_timezone(&Local).format("%H:%M"),
                brief.model
            ),
            styles::BRIEF_META,
        ));
        lines.push(Line::default());

        for wrapped in word_wrap(&brief.summary, w.saturating_sub(2)) {
            lines.push(Line::raw(wrapped));
        }

        if !brief.key_threats.is_empty() {
            lines.push(Line::default());
            lines.push(Line::styled("KEY THREATS", styles::BRIEF_TITLE));
            for threat in &brief.key_threats {
                for (i, wrapped) in word_wrap(&format!("● {threat}"), w.saturating_sub(2))
                    .into_iter()
                    .enumerate()
                {
                    let indented = if i == 0 {
                        wrapped
                    } else {
                        format!("  {wrapped}")
                    };
                    lines.push(Line::styled(indented, styles::THREAT_ITEM));
                }
            }
        }

        self.brief_panel = Text::from(lines);
    }

    fn rebuild_markets_panel(&mut self) {
        let (_, _, quad_w) = self.overview_geometry();
        let w = quad_w.saturating_sub(2).max(20);
        let mut lines: Vec<Line<'static>> = Vec::new();

        if let Some(err) = self.errors.get(&SourceId::Crypto) {
            lines.push(Line::styled(format!("⚠ crypto: {err}"), styles::ERROR));
        } else if self.crypto.is_empty() {
            lines.push(Line::raw(" fetching crypto..."));
        } else {
            let sym_w = 5;
            let price_w = 11;
            let name_w = w.saturating_sub(sym_w + price_w + 8 + 4).max(4);
            lines.push(Line::styled(
                format!(
                    "{:<sym_w$} {:<name_w$} {:>price_w$} {:>8}",
                    "SYM", "NAME", "PRICE", "24H%"
                ),
                styles::TABLE_HEADER,
            ));
            lines.push(Line::styled("─".repeat((w.saturating_sub(1)).min(55)), styles::DIVIDER));
            for price in &self.crypto {
                lines.push(Line::from(vec![
                    Span::styled(format!("{:<sym_w$}", price.symbol), styles::SYMBOL),
                    Span::raw(format!(" {:<name_w$}", truncate_chars(&price.name, name_w))),
                    Span::raw(format!(" {:>price_w$} ", markets::format_price(price.price_usd))),
                    change_span(price.change_24h),
                ]));
            }
        }

        lines.push(Line::default());
        lines.push(Line::styled(" INDICES", styles::SUB_SECTION_HEADER));
        if let Some(err) = self.errors.get(&SourceId::Stocks) {
            lines.push(Line::styled(format!("⚠ {err}"), styles::ERROR));
        } else if self.indices.is_empty() {
            lines.push(Line::styled("  fetching...", styles::MUTED));
        } else {
            let name_w = w.saturating_sub(14).max(6);
            for index in &self.indices {
                lines.push(Line::from(vec![
                    Span::raw(format!("{:<name_w$}", truncate_chars(index.name, name_w))),
                    Span::raw(format!(" {:>11} ", markets::format_price(index.price))),
                    change_span(index.change_pct),
                ]));
            }
        }

        lines.push(Line::default());
        lines.push(Line::styled(" COMMODITIES", styles::SUB_SECTION_HEADER));
        if let Some(err) = self.errors.get(&SourceId::Commodities) {
            lines.push(Line::styled(format!("⚠ {err}"), styles::ERROR));
        } else if self.commodities.is_empty() {
            lines.push(Line::styled("  fetching...", styles::MUTED));
        } else {
            let name_w = w.saturating_sub(22).max(6);
            for commodity in &self.commodities {
                lines.push(Line::from(vec![
                    Span::raw(format!("{:<name_w$}", truncate_chars(commodity.name, name_w))),
                    Span::raw(format!(" {:>9} ", markets::format_price(commodity.price))),
                    Span::styled(format!("{:<6} ", commodity.unit), styles::MUTED),
                    change_span(commodity.change_pct),
                ]));
            }
        }

        self.markets_panel = Text::from(lines);
    }

    fn rebuild_prediction_panel(&mut self) {
        let (_, bot_h, quad_w) = self.overview_geometry();
        let w = quad_w.saturating_sub(2).max(20);
        let h = bot_h.saturating_sub(2).max(4);
        let mut lines: Vec<Line<'static>> = Vec::new();

        if let Some(err) = self.errors.get(&SourceId::PredictionMarkets) {
            self.prediction_panel = Text::from(Line::styled(format!("⚠ {err}"), styles::ERROR));
            return;
        }
        if self.prediction_markets.is_empty() {
            self.prediction_panel = Text::from(Line::raw(" fetching markets..."));
            return;
        }

        let title_w = w.saturating_sub(16).max(10);
        lines.push(Line::styled(
            format!("{:<title_w$} {:>6}  {:>5}", "QUESTION", "YES%", "ENDS"),
            styles::TABLE_HEADER,
        ));
        lines.push(Line::styled("─".repeat((w.saturating_sub(1)).min(70)), styles::DIVIDER));

        let max_rows = h.saturating_sub(2).max(1);
        for market in self.prediction_markets.iter().take(max_rows) {
            let pct = market.probability * 100.0;
            // ISO date; keep just MM-DD
            let end = market
                .end_date
                .get(5..10)
                .unwrap_or(&market.end_date)
                .to_owned();
            lines.push(Line::from(vec![
                Span::raw(format!("{:<title_w$} ", truncate_chars(&market.title, title_w))),
                Span::styled(format!("{pct:>5.1}%"), styles::probability_style(market.probability)),
                Span::raw(format!("  {end:>5}")),
            ]));
        }

        self.prediction_panel = Text::from(lines);
    }

    // Test-facing accessors.
    #[cfg(test)]
    pub(crate) fn state_snapshot(&self) -> StateSnapshot<'_> {
        StateSnapshot {
            global_news: &self.global_news,
            local_news: &self.local_news,
            crypto: &self.crypto,
            indices: &self.indices,
            commodities: &self.commodities,
            prediction_markets: &self.prediction_markets,
            weather: self.weather.as_ref(),
            brief: self.brief.as_ref(),
            loading: &self.loading,
            errors: &self.errors,
            selected_news: self.selected_news,
            news_header_lines: self.news_header_lines,
            news_view: self.news_view,
            news_text: &self.news_text,
            local_text: &self.local_text,
            brief_panel: &self.brief_panel,
            markets_panel: &self.markets_panel,
        }
    }
}

#[cfg(test)]
pub(crate) struct StateSnapshot<'a> {
    pub global_news: &'a [NewsItem],
    pub local_news: &'a [NewsItem],
    pub crypto: &'a [CryptoPrice],
    pub indices: &'a [markets::StockIndex],
    pub commodities: &'a [Commodity],
    pub prediction_markets: &'a [PredictionMarket],
    pub weather: Option<&'a Conditions>,
    pub brief: Option<&'a Brief>,
    pub loading: &'a BTreeSet<SourceId>,
    pub errors: &'a BTreeMap<SourceId, String>,
    pub selected_news: usize,
    pub news_header_lines: usize,
    pub news_view: Viewport,
    pub news_text: &'a Text<'static>,
    pub local_text: &'a Text<'static>,
    pub brief_panel: &'a Text<'static>,
    pub markets_panel: &'a Text<'static>,
}

fn step_index(current: usize, delta: i64, max: usize) -> usize {
    let next = current as i64 + delta;
    next.clamp(0, max as i64) as usize
}

fn change_span(change_pct: f64) -> Span<'static> {
    let (style, icon) = if change_pct < 0.0 {
        (styles::NEGATIVE, "▼")
    } else {
        (styles::POSITIVE, "▲")
    };
    Span::styled(format!("{icon}{change_pct:>5.2}%"), style)
}

/// Appends the 3-line item rows for one news list.
fn push_news_items(
    lines: &mut Vec<Line<'static>>,
    items: &[NewsItem],
    cap: usize,
    selected: usize,
    inner_w: usize,
    show_source: bool,
) {
    let title_w = inner_w.saturating_sub(39).max(20);
    for (i, item) in items.iter().take(cap).enumerate() {
        let badge = Span::styled(
            format!(" {:<8}", item.severity.label()),
            styles::severity_style(item.severity),
        );
        let age = Span::styled(format_age(item.published), styles::AGE);
        let url_marker = if item.url.is_empty() { "" } else { "  ↗" };

        let mut meta_spans = vec![badge, Span::raw(" ")];
        if show_source {
            meta_spans.push(Span::styled(item.source.clone(), styles::SOURCE));
            meta_spans.push(Span::raw("  "));
        }
        meta_spans.push(age);
        meta_spans.push(Span::styled(url_marker, styles::MUTED));

        let title = truncate_chars(&item.title, title_w);
        if i == selected {
            lines.push(Line::from(meta_spans).style(styles::SELECTED_ROW));
            lines.push(
                Line::from(vec![Span::raw("  "), Span::styled(title, styles::SELECTED_TITLE)])
                    .style(styles::SELECTED_ROW),
            );
        } else {
            lines.push(Line::from(meta_spans));
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(title, styles::NEWS_TITLE),
            ]));
        }
        lines.push(Line::default());
    }
}

/// Country-risk panel shown as the news pane header. Returns its lines;
/// the caller counts them toward `news_header_lines`.
fn risk_panel_lines(brief: Option<&Brief>, loading: bool, w: usize) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::styled("🌡  COUNTRY RISK INDEX", styles::BRIEF_TITLE),
        Line::styled("─".repeat(w.min(120)), styles::DIVIDER),
    ];

    let risks = brief.map(|b| b.country_risks.as_slice()).unwrap_or_default();
    if risks.is_empty() {
        if loading {
            lines.push(Line::raw("  Computing risks..."));
        } else {
            lines.push(Line::styled("  Press [b] to generate risk scores.", styles::MUTED));
        }
        return lines;
    }

    const SCORE_W: usize = 4;
    const BAR_W: usize = 14;
    const GAP_W: usize = 2;

    let two_columns = w >= 100;
    let col_w = if two_columns { w / 2 } else { w };
    let name_w = col_w.saturating_sub(SCORE_W + BAR_W + GAP_W * 3 + 2).max(8);
    let reason_w = name_w + SCORE_W + GAP_W;

    let render_row = |risk: &intel::CountryRisk| -> (Line<'static>, Line<'static>) {
        let filled = (usize::from(risk.score) * BAR_W / 100).min(BAR_W);
        let bar_style = styles::risk_score_style(risk.score);
        let country = pad_chars(&risk.country, name_w);
        let reason = truncate_chars(&risk.reason, reason_w);

        let top = Line::from(vec![
            Span::raw("  "),
            Span::raw(country),
            Span::raw("  "),
            Span::styled(format!("{:>3}", risk.score), styles::BRIEF_META),
            Span::raw("  "),
            Span::styled("█".repeat(filled), bar_style),
            Span::styled("░".repeat(BAR_W - filled), styles::MUTED),
        ]);
        let bottom = Line::from(vec![Span::raw("  "), Span::styled(reason, styles::MUTED)]);
        (top, bottom)
    };

    if !two_columns {
        for risk in risks {
            let (top, bottom) = render_row(risk);
            lines.push(top);
            lines.push(bottom);
        }
        return lines;
    }

    for pair in risks.chunks(2) {
        let (left_top, left_bottom) = render_row(&pair[0]);
        let right = pair.get(1).map(render_row);
        let (right_top, right_bottom) = match right {
            Some((t, b)) => (Some(t), Some(b)),
            None => (None, None),
        };
        lines.push(join_columns(left_top, right_top, col_w));
        lines.push(join_columns(left_bottom, right_bottom, col_w));
    }
    lines
}

fn join_columns(
    left: Line<'static>,
    right: Option<Line<'static>>,
    col_w: usize,
) -> Line<'static> {
    let mut spans = left.spans;
    if let Some(right) = right {
        let used: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        if used < col_w {
            spans.push(Span::raw(" ".repeat(col_w - used)));
        }
        spans.extend(right.spans);
    }
    Line::from(spans)
}

// ─── Drawing ─────────────────────────────────────────────────────────────

pub fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(header_line(app, area.width)).style(styles::HEADER_BG), rows[0]);
    frame.render_widget(Paragraph::new(tabs_line(app.active_tab)), rows[1]);

    match app.active_tab {
        Tab::Overview => draw_overview(frame, app, rows[2]),
        Tab::GlobalNews => {
            let pane = Paragraph::new(app.news_text.clone())
                .block(Block::default().borders(Borders::ALL))
                .scroll((app.news_view.y_offset.min(u16::MAX as usize) as u16, 0));
            frame.render_widget(pane, rows[2]);
        }
        Tab::Local => {
            let pane = Paragraph::new(app.local_text.clone())
                .block(Block::default().borders(Borders::ALL))
                .scroll((app.local_view.y_offset.min(u16::MAX as usize) as u16, 0));
            frame.render_widget(pane, rows[2]);
        }
    }

    frame.render_widget(Paragraph::new(footer_line(app)), rows[3]);
}

fn draw_overview(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let content_h = area.height;
    let top_h = (u32::from(content_h) * 4 / 10).max(8) as u16;
    let grid = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(top_h),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let split_row = |row: Rect| {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(50),
                Constraint::Length(1),
                Constraint::Percentage(50),
            ])
            .split(row);
        (halves[0], halves[2])
    };
    let (top_left, top_right) = split_row(grid[0]);
    let (bot_left, bot_right) = split_row(grid[2]);

    let quadrant = |title: String, content: &Text<'static>| {
        Paragraph::new(content.clone()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(title, styles::QUADRANT_TITLE)),
        )
    };

    frame.render_widget(
        quadrant(format!("🌤  WEATHER  {}", app.cfg.location.city), &app.weather_panel),
        top_left,
    );
    frame.render_widget(quadrant("🧠  INTEL BRIEF".to_owned(), &app.brief_panel), top_right);
    frame.render_widget(
        quadrant("₿  MARKETS & PRICES".to_owned(), &app.markets_panel),
        bot_left,
    );
    frame.render_widget(
        quadrant("📊  PREDICTION MARKETS".to_owned(), &app.prediction_panel),
        bot_right,
    );
}

fn header_line(app: &App, width: u16) -> Line<'static> {
    let title = "🌍 WATCHTOWER";
    let mut right = "real-time intelligence".to_owned();
    if !app.loading.is_empty() {
        right.push_str("  loading...");
    }
    if let Some(at) = app.last_refresh {
        right.push_str(&format!("  updated {}", at.format("%H:%M:%S")));
    }
    let gap = usize::from(width)
        .saturating_sub(title.chars().count() + right.chars().count() + 4)
        .max(1);
    Line::from(vec![
        Span::styled(format!(" {title}"), styles::TITLE),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, styles::SUBTITLE),
    ])
}

fn tabs_line(active: Tab) -> Line<'static> {
    let mut spans = Vec::new();
    for tab in Tab::ALL {
        if tab == active {
            spans.push(Span::styled(format!("[ {} ]", tab.title()), styles::ACTIVE_TAB));
        } else {
            spans.push(Span::styled(format!("  {}  ", tab.title()), styles::INACTIVE_TAB));
        }
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn footer_line(app: &App) -> Line<'static> {
    if let Some(message) = app.active_toast() {
        return Line::styled(format!("  ✓ {message}"), styles::FOOTER_STATUS);
    }
    let hint = match app.active_tab {
        Tab::GlobalNews => {
            "  jk navigate  enter open in browser  d/u page  g/G top/bottom  tab switch  r refresh  b brief  q quit"
        }
        Tab::Local => {
            "  jk navigate  enter open in browser  d/u page  g/G top/bottom  tab switch  r refresh  q quit"
        }
        Tab::Overview => {
            "  tab/←→ switch  1 overview  2 news  3 local  r refresh  b brief  B force brief  q quit"
        }
    };
    Line::styled(hint, styles::FOOTER)
}

// ─── Terminal lifecycle ──────────────────────────────────────────────────

/// RAII guard for raw mode + alternate screen; restores the terminal on
/// drop so a panic or early return never leaves the shell unusable.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    fn draw(&mut self, render: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

// ─── Entry points ────────────────────────────────────────────────────────

/// Runs the dashboard until quit. Owns the runtime.
pub fn run(cfg: Config) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_event_loop(cfg))
}

async fn run_event_loop(cfg: Config) -> Result<(), Box<dyn Error>> {
    let clients = Clients::new()?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut terminal = TerminalSession::new()?;
    spawn_input_reader(tx.clone());

    let mut app = App::new(cfg, clients, BriefCache::default_location(), tx);
    let (width, height) = crossterm::terminal::size().unwrap_or((80, 24));
    app.handle_msg(Msg::Resize(width, height));
    app.bootstrap();
    terminal.draw(|frame| draw(frame, &app))?;

    while !app.should_quit {
        let Some(msg) = rx.recv().await else {
            break;
        };
        app.handle_msg(msg);
        // Drain whatever else already arrived before paying for a redraw.
        while let Ok(msg) = rx.try_recv() {
            app.handle_msg(msg);
            if app.should_quit {
                break;
            }
        }
        terminal.draw(|frame| draw(frame, &app))?;
    }

    Ok(())
}

/// Bridges blocking crossterm input into the async inbox. The thread ends
/// when the receiving side is gone.
fn spawn_input_reader(tx: UnboundedSender<Msg>) {
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if tx.send(Msg::Key(key)).is_err() {
                    break;
                }
            }
            Ok(Event::Resize(width, height)) => {
                if tx.send(Msg::Resize(width, height)).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    });
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn format_age(published: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(published);
    if age.num_minutes() < 1 {
        "just now".to_owned()
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_hours() < 24 {
        format!("{}h ago", age.num_hours())
    } else {
        published.with_timezone(&Local).format("%b %d").to_string()
    }
}

fn word_wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_owned()];
    }
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + word.chars().count() + 1 > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn truncate_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn pad_chars(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        return truncate_chars(text, width);
    }
    let mut out = text.to_owned();
    out.extend(std::iter::repeat(' ').take(width - count));
    out
}

/// Opens a URL with the platform opener, fully detached; failures are
/// silently ignored so the TUI never crashes over a missing browser.
fn open_in_browser(url: &str) {
    for opener in ["xdg-open", "open", "start"] {
        let spawned = Command::new(opener)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if spawned.is_ok() {
            return;
        }
    }
}
