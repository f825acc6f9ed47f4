//! End-to-end tests: a fully wired bot fed with server lines.

use async_trait::async_trait;
use frank::config::Config;
use frank::error::FetchError;
use frank::fetch::{FetchedTitle, TitleFetcher};
use frank::handlers::Dispatcher;
use frank::network::Connection;
use frank::state::{KarmaStore, LastSeenStore};
use frank::{Bot, Services};
use frank_proto::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

struct FixedTitle;

#[async_trait]
impl TitleFetcher for FixedTitle {
    async fn fetch_title(&self, url: &str) -> Result<FetchedTitle, FetchError> {
        Ok(FetchedTitle {
            title: "Example Domain".to_string(),
            final_url: url.to_string(),
        })
    }
}

fn test_bot() -> (Arc<Bot>, mpsc::UnboundedReceiver<String>) {
    let config: Config = toml::from_str(
        r##"
        [irc]
        server = "irc.test:6667"
        nick = "frank"
        channels = ["#test"]
        admins = ["alice"]

        [greet]
        channels = ["#test"]
        "##,
    )
    .unwrap();
    let services = Services {
        karma: Arc::new(KarmaStore::in_memory(&config.irc.nick)),
        last_seen: Arc::new(LastSeenStore::in_memory(
            config.greet.retention(),
            config.greet.write_interval(),
        )),
        fetcher: Arc::new(FixedTitle),
        http: reqwest::Client::new(),
        events: None,
        probe: None,
    };
    Bot::new(config, services).unwrap()
}

fn dispatcher(bot: &Bot) -> Dispatcher {
    Dispatcher::new(Arc::clone(bot.registry()), Duration::from_secs(5))
}

fn line(raw: &str) -> Message {
    raw.parse().unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_newcomer_is_greeted_once() {
    let (bot, mut rx) = test_bot();
    let dispatcher = dispatcher(&bot);

    let report = dispatcher.run(line(":carol!c@example.org JOIN #test")).await;
    assert!(report.is_ok());
    assert_eq!(rx.try_recv().unwrap(), "PRIVMSG #test :Hey carol! o/");
    assert!(bot.tracker().is_member("carol", "#test"));

    tokio::time::sleep(Duration::from_secs(1)).await;

    let report = dispatcher.run(line(":carol!c@example.org JOIN #test")).await;
    assert!(report.is_ok());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_karma_round_trip() {
    let (bot, mut rx) = test_bot();
    let dispatcher = dispatcher(&bot);

    dispatcher.run(line(":carol!c@h PRIVMSG #test :rust++")).await;
    dispatcher.run(line(":dave!d@h PRIVMSG #test :rust++ # fast")).await;
    dispatcher.run(line(":carol!c@h PRIVMSG #test :karma rust")).await;

    assert_eq!(rx.try_recv().unwrap(), "PRIVMSG #test :[Karma] rust: 2");
}

#[tokio::test]
async fn test_link_title_is_posted() {
    let (bot, mut rx) = test_bot();
    let dispatcher = dispatcher(&bot);

    dispatcher
        .run(line(":carol!c@h PRIVMSG #test :see https://example.com/"))
        .await;

    let posted = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(posted, "PRIVMSG #test :[Link Info] Example Domain");
}

#[tokio::test]
async fn test_session_until_admin_quit() {
    let (bot, outbound) = test_bot();
    let (client, server) = tokio::io::duplex(8192);
    let (server_read, mut server_write) = tokio::io::split(server);
    let mut server_lines = BufReader::new(server_read).lines();

    let session = tokio::spawn(Arc::clone(&bot).run(Connection::new(client), outbound));

    assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "NICK frank");
    assert_eq!(
        server_lines.next_line().await.unwrap().unwrap(),
        "USER frank 0 * :frank"
    );

    server_write
        .write_all(b":irc.test 001 frank :Welcome\r\nPING :irc.test\r\n")
        .await
        .unwrap();
    let mut seen = vec![
        server_lines.next_line().await.unwrap().unwrap(),
        server_lines.next_line().await.unwrap().unwrap(),
    ];
    seen.sort();
    assert_eq!(seen, ["JOIN #test", "PONG :irc.test"]);

    server_write
        .write_all(b":alice!a@h PRIVMSG frank :REALLY_QUIT\r\n")
        .await
        .unwrap();
    assert_eq!(
        server_lines.next_line().await.unwrap().unwrap(),
        "PRIVMSG alice :As you wish."
    );
    assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "QUIT");

    session.await.unwrap().unwrap();
}
