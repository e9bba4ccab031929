use std::{sync::Arc, time::Duration};

use mockall::predicate::*;
use teloxide::{
    ApiError, RequestError,
    types::{ChatId, MessageId, Recipient},
    utils::command::BotCommands,
};

use super::*;
use crate::{
    fetcher::{FetchError, FetchWindow, KeywordFilter, MockFetcher},
    messaging::{MockMessagingService, format::Style},
    notifier::Notifier,
    poller::{Feed, Poller},
    record::Record,
    storage::MockSeenStore,
    subscribers::Subscribers,
};

const CHAT_ID: ChatId = ChatId(123);

// Test harness wiring mocks into a full application context.
struct TestHarness {
    bot_handler: BotHandler,
    app: Arc<AppContext>,
}

impl TestHarness {
    fn new(
        messaging: MockMessagingService,
        news: MockFetcher,
        releases: MockFetcher,
        scores: Option<MockFetcher>,
    ) -> Self {
        let mut seen_store = MockSeenStore::new();
        // Commands never consult the seen-set.
        seen_store.expect_is_new().times(0);
        seen_store.expect_mark_sent().times(0);

        let notifier = Arc::new(Notifier::new(Arc::new(messaging), 3, Duration::ZERO, None));
        let subscribers = Arc::new(Subscribers::new());
        let poller = Arc::new(Poller::new(
            Arc::new(seen_store),
            notifier,
            subscribers.clone(),
            Vec::new(),
        ));

        let app = Arc::new(AppContext {
            poller,
            subscribers,
            news: Arc::new(Feed::new(
                "news",
                Arc::new(news),
                Style::News,
                KeywordFilter::new(["anime"]),
            )),
            releases: Arc::new(Feed::new(
                "releases",
                Arc::new(releases),
                Style::Release,
                KeywordFilter::allow_all(),
            )),
            scores: scores.map(|fetcher| {
                Arc::new(Feed::new("scores", Arc::new(fetcher), Style::Score, KeywordFilter::allow_all()))
            }),
            live_filter: KeywordFilter::status(["1H", "2H", "HT"]),
            early_window: FetchWindow::Ahead(3),
        });

        Self { bot_handler: BotHandler::new(app.clone()), app }
    }

    async fn handle(&self, cmd: Command) -> BotHandlerResult<()> {
        self.bot_handler.handle_commands(CHAT_ID, cmd).await
    }
}

fn unused_fetcher() -> MockFetcher {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(0);
    fetcher
}

fn fetcher_returning(window: FetchWindow, records: Vec<Record>) -> MockFetcher {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().with(eq(window)).times(1).returning(move |_| Ok(records.clone()));
    fetcher
}

fn record(id: &str, title: &str) -> Record {
    Record { id: id.to_string(), title: title.to_string(), ..Default::default() }
}

fn match_record(id: &str, status: &str) -> Record {
    Record { status: Some(status.to_string()), ..record(id, "Home vs Away") }
}

fn expect_reply_containing(messaging: &mut MockMessagingService, needle: &'static str) {
    messaging
        .expect_send_text()
        .with(
            eq(Recipient::Id(CHAT_ID)),
            function(move |text: &String| text.contains(needle)),
            eq(false),
            always(),
        )
        .times(1)
        .returning(|_, _, _, _| Ok(MessageId(1)));
}

#[test]
fn test_command_parsing() {
    assert_eq!(Command::parse("/news", "bot").unwrap(), Command::News);
    assert_eq!(Command::parse("/upcoming@bot", "bot").unwrap(), Command::Upcoming);
    assert!(Command::parse("/unknown", "bot").is_err());
}

#[tokio::test]
async fn test_help_lists_all_commands() {
    let mut messaging = MockMessagingService::new();
    messaging
        .expect_send_text()
        .withf(|_, text, _, _| {
            ["/start", "/help", "/news", "/score", "/live", "/upcoming", "/subscribe", "/stop"]
                .iter()
                .all(|cmd| text.contains(cmd))
        })
        .times(1)
        .returning(|_, _, _, _| Ok(MessageId(1)));

    let harness = TestHarness::new(messaging, unused_fetcher(), unused_fetcher(), None);
    assert!(harness.handle(Command::Help).await.is_ok());
}

#[tokio::test]
async fn test_start_sends_welcome() {
    let mut messaging = MockMessagingService::new();
    expect_reply_containing(&mut messaging, "Welcome");

    let harness = TestHarness::new(messaging, unused_fetcher(), unused_fetcher(), None);
    assert!(harness.handle(Command::Start).await.is_ok());
}

#[tokio::test]
async fn test_news_subscribes_and_relays_filtered_records() {
    let mut messaging = MockMessagingService::new();
    messaging
        .expect_send_text()
        .with(
            eq(Recipient::Id(CHAT_ID)),
            function(|text: &String| text.contains("Anime X Episode 2")),
            eq(true),
            always(),
        )
        .times(1)
        .returning(|_, _, _, _| Ok(MessageId(1)));

    let news = fetcher_returning(
        FetchWindow::Today,
        vec![record("1", "Anime X Episode 2"), record("2", "Local News Today")],
    );
    let harness = TestHarness::new(messaging, news, unused_fetcher(), None);

    assert!(harness.handle(Command::News).await.is_ok());
    assert!(harness.app.subscribers.list().await.contains(&CHAT_ID));
}

#[tokio::test]
async fn test_news_with_no_matches_replies_no_data() {
    let mut messaging = MockMessagingService::new();
    expect_reply_containing(&mut messaging, "no data found right now");

    let news = fetcher_returning(FetchWindow::Today, vec![record("2", "Local News Today")]);
    let harness = TestHarness::new(messaging, news, unused_fetcher(), None);

    assert!(harness.handle(Command::News).await.is_ok());
}

#[tokio::test]
async fn test_fetch_failure_replies_no_data() {
    let mut messaging = MockMessagingService::new();
    expect_reply_containing(&mut messaging, "no data found right now");

    let mut releases = MockFetcher::new();
    releases
        .expect_fetch()
        .with(eq(FetchWindow::Ahead(3)))
        .returning(|_| Err(FetchError::SourceUnreachable("timeout".to_string())));
    let harness = TestHarness::new(messaging, unused_fetcher(), releases, None);

    assert!(harness.handle(Command::Upcoming).await.is_ok());
}

#[tokio::test]
async fn test_upcoming_uses_early_window_and_limit() {
    let mut messaging = MockMessagingService::new();
    messaging.expect_send_text().times(5).returning(|_, _, _, _| Ok(MessageId(1)));

    let records = (0..8).map(|i| record(&i.to_string(), &format!("Show {i}"))).collect();
    let releases = fetcher_returning(FetchWindow::Ahead(3), records);
    let harness = TestHarness::new(messaging, unused_fetcher(), releases, None);

    assert!(harness.handle(Command::Upcoming).await.is_ok());
    assert!(!harness.app.subscribers.list().await.contains(&CHAT_ID));
}

#[tokio::test]
async fn test_score_without_provider_replies_not_configured() {
    let mut messaging = MockMessagingService::new();
    expect_reply_containing(&mut messaging, "not configured");

    let harness = TestHarness::new(messaging, unused_fetcher(), unused_fetcher(), None);

    assert!(harness.handle(Command::Score).await.is_ok());
    assert!(!harness.app.subscribers.list().await.contains(&CHAT_ID));
}

#[tokio::test]
async fn test_score_subscribes_and_relays() {
    let mut messaging = MockMessagingService::new();
    messaging.expect_send_text().times(2).returning(|_, _, _, _| Ok(MessageId(1)));

    let scores = fetcher_returning(
        FetchWindow::Today,
        vec![match_record("m1", "FT"), match_record("m2", "NS")],
    );
    let harness = TestHarness::new(messaging, unused_fetcher(), unused_fetcher(), Some(scores));

    assert!(harness.handle(Command::Score).await.is_ok());
    assert!(harness.app.subscribers.list().await.contains(&CHAT_ID));
}

#[tokio::test]
async fn test_live_only_sends_matches_in_progress() {
    let mut messaging = MockMessagingService::new();
    messaging
        .expect_send_text()
        .with(
            eq(Recipient::Id(CHAT_ID)),
            function(|text: &String| text.contains("2H")),
            eq(false),
            always(),
        )
        .times(1)
        .returning(|_, _, _, _| Ok(MessageId(1)));

    let scores = fetcher_returning(
        FetchWindow::Today,
        vec![match_record("m1", "FT"), match_record("m2", "2H"), match_record("m3", "NS")],
    );
    let harness = TestHarness::new(messaging, unused_fetcher(), unused_fetcher(), Some(scores));

    assert!(harness.handle(Command::Live).await.is_ok());
}

#[tokio::test]
async fn test_subscribe_then_stop() {
    let mut messaging = MockMessagingService::new();
    expect_reply_containing(&mut messaging, "Subscribed");
    expect_reply_containing(&mut messaging, "Unsubscribed");

    let harness = TestHarness::new(messaging, unused_fetcher(), unused_fetcher(), None);

    assert!(harness.handle(Command::Subscribe).await.is_ok());
    assert!(harness.app.subscribers.list().await.contains(&CHAT_ID));
    assert!(harness.handle(Command::Stop).await.is_ok());
    assert!(!harness.app.subscribers.list().await.contains(&CHAT_ID));
}

#[tokio::test]
async fn test_stop_when_not_subscribed() {
    let mut messaging = MockMessagingService::new();
    expect_reply_containing(&mut messaging, "was not subscribed");

    let harness = TestHarness::new(messaging, unused_fetcher(), unused_fetcher(), None);
    assert!(harness.handle(Command::Stop).await.is_ok());
}

#[tokio::test]
async fn test_blocked_chat_surfaces_error() {
    let mut messaging = MockMessagingService::new();
    messaging
        .expect_send_text()
        .times(1)
        .returning(|_, _, _, _| Err(RequestError::Api(ApiError::BotBlocked).into()));

    let news = fetcher_returning(FetchWindow::Today, vec![record("1", "Anime X")]);
    let harness = TestHarness::new(messaging, news, unused_fetcher(), None);

    assert!(matches!(harness.handle(Command::News).await, Err(BotHandlerError::Messaging(_))));
}
