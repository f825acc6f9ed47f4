//! Bot wiring: builds the listeners from the config and reacts to the few
//! server events that concern the connection itself.
//!
//! ```text
//!   Connection ──▶ Bot::handle_message ──▶ spawn(Dispatcher::run)
//!                    │                          │
//!                    ├─ 001: identify, join,    └─▶ every registered listener
//!                    │       start pollers
//!                    └─ 433: retry as nick_, rebuild listeners
//! ```

use crate::config::Config;
use crate::db::{EventSource, SqliteEventSource};
use crate::error::{ConnectionError, FetchError, StartupError};
use crate::fetch::{HttpTitleFetcher, TitleFetcher, build_client};
use crate::handlers::{
    AdminListener, Correlation, Dispatcher, FeedPoller, GreetListener, HelpListener,
    HighlightListener, InviteListener, KarmaListener, LmgtfyListener, LuckySearch,
    ManpageListener, MembersListener, PingProbe, RaumbangListener, Registry, RoomProbe,
    TopicChanger, UrlListener, lucky_client,
};
use crate::network::{Connection, Outbox};
use crate::state::persistence::write_off_worker;
use crate::state::{Identity, KarmaStore, LastSeenStore, MembershipTracker, TitleCache};
use crate::telemetry::spans;
use frank_proto::{ERR_NICKNAMEINUSE, Message, RPL_WELCOME};
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tracing::{Instrument, error, info, warn};

/// How long to wait for nickserv to confirm the identify.
const NICKSERV_TIMEOUT: Duration = Duration::from_secs(10);

/// Collaborators that touch the outside world.
///
/// Built from the config at startup, or by hand in tests.
pub struct Services {
    pub karma: Arc<KarmaStore>,
    pub last_seen: Arc<LastSeenStore>,
    pub fetcher: Arc<dyn TitleFetcher>,
    pub http: reqwest::Client,
    pub events: Option<Arc<dyn EventSource>>,
    pub probe: Option<Arc<dyn RoomProbe>>,
}

impl Services {
    pub async fn from_config(config: &Config) -> Result<Self, StartupError> {
        let fetcher = HttpTitleFetcher::new(config.urls.fetch_timeout(), config.urls.max_title_len)?;
        let http = build_client(config.urls.fetch_timeout()).map_err(FetchError::from)?;

        let events: Option<Arc<dyn EventSource>> = match &config.topic.database {
            Some(path) => Some(Arc::new(SqliteEventSource::connect(path).await?)),
            None => None,
        };
        let probe: Option<Arc<dyn RoomProbe>> = config
            .raumbang
            .as_ref()
            .map(|r| Arc::new(PingProbe::new(r.host.clone())) as Arc<dyn RoomProbe>);

        Ok(Self {
            karma: Arc::new(KarmaStore::load(&config.karma.path, &config.irc.nick)),
            last_seen: Arc::new(LastSeenStore::load(
                &config.greet.path,
                config.greet.retention(),
                config.greet.write_interval(),
            )),
            fetcher: Arc::new(fetcher),
            http,
            events,
            probe,
        })
    }
}

pub struct Bot {
    config: Config,
    services: Services,
    identity: Arc<Identity>,
    outbox: Outbox,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    tracker: Arc<MembershipTracker>,
    titles: Arc<TitleCache>,
    url_ignore: Option<Regex>,
    topic: Option<Arc<TopicChanger>>,
    lucky: Option<Arc<LuckySearch>>,
    ignored_nicks: Vec<String>,
    shutdown_tx: broadcast::Sender<()>,
    /// Pollers are started on the first 001 only; reconnects must not double them.
    background_started: AtomicBool,
}

impl Bot {
    /// Wire up the bot. The receiver yields every line the bot wants sent.
    pub fn new(
        config: Config,
        services: Services,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<String>), StartupError> {
        let (outbox, outbound) = Outbox::new();
        let outbox = outbox.with_chanserv_invite(config.irc.nickserv_password.is_some());
        let identity = Arc::new(Identity::new(
            config.irc.nick.clone(),
            config.irc.admins.clone(),
        ));
        let registry = Arc::new(Registry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), config.dispatch.handler_timeout());

        let url_ignore = match config.urls.ignore_pattern.as_str() {
            "" => None,
            pattern => Some(Regex::new(pattern)?),
        };
        let topic = services.events.as_ref().map(|events| {
            Arc::new(TopicChanger::new(
                Arc::clone(&registry),
                outbox.clone(),
                Arc::clone(events),
                Duration::from_secs(config.topic.fetch_timeout_secs),
            ))
        });
        let lucky = if config.lmgtfy.enabled {
            let client = lucky_client(config.urls.fetch_timeout(), &config.lmgtfy.stay_on)
                .map_err(FetchError::from)?;
            Some(Arc::new(LuckySearch::new(
                client,
                config.lmgtfy.search_url.clone(),
                Arc::clone(&services.fetcher),
            )))
        } else {
            None
        };
        let (shutdown_tx, _) = broadcast::channel(4);

        let bot = Arc::new(Self {
            identity,
            outbox,
            registry,
            dispatcher,
            tracker: Arc::new(MembershipTracker::new()),
            titles: Arc::new(TitleCache::new(
                config.urls.cache_capacity,
                config.urls.cache_ttl(),
            )),
            url_ignore,
            topic,
            lucky,
            ignored_nicks: config
                .irc
                .ignored_nicks
                .iter()
                .map(|n| n.to_lowercase())
                .collect(),
            shutdown_tx,
            background_started: AtomicBool::new(false),
            services,
            config,
        });
        bot.register_listeners();
        Ok((bot, outbound))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn tracker(&self) -> &Arc<MembershipTracker> {
        &self.tracker
    }

    /// Sender side of the shutdown signal; sending on it stops the bot.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Register the permanent listener set.
    fn register_listeners(&self) {
        let registry = &self.registry;
        let identity = &self.identity;

        registry.add(
            "membership tracker",
            Arc::new(MembersListener::new(Arc::clone(&self.tracker))),
        );
        registry.add(
            "greet",
            Arc::new(GreetListener::new(
                Arc::clone(identity),
                self.outbox.clone(),
                Arc::clone(&self.services.last_seen),
                self.config.greet.channels.clone(),
                self.config.greet.template.clone(),
            )),
        );
        registry.add(
            "karma",
            Arc::new(KarmaListener::new(
                Arc::clone(identity),
                self.outbox.clone(),
                Arc::clone(&self.services.karma),
            )),
        );
        registry.add(
            "urifind",
            Arc::new(UrlListener::new(
                Arc::clone(identity),
                self.outbox.clone(),
                Arc::clone(&self.titles),
                Arc::clone(&self.services.fetcher),
                self.url_ignore.clone(),
                self.config.urls.pointless_titles.clone(),
                self.config.urls.no_repost(),
                self.config.urls.fetch_timeout(),
            )),
        );
        registry.add(
            "help",
            Arc::new(HelpListener::new(Arc::clone(identity), self.outbox.clone())),
        );
        registry.add(
            "highlight",
            Arc::new(HighlightListener::new(
                Arc::clone(identity),
                self.outbox.clone(),
                Duration::from_millis(self.config.highlight.delay_ms),
                self.config.highlight.public_channel.clone(),
            )),
        );
        if let (Some(probe), Some(raumbang)) = (&self.services.probe, &self.config.raumbang) {
            registry.add(
                "raumbang",
                Arc::new(RaumbangListener::new(
                    Arc::clone(identity),
                    self.outbox.clone(),
                    Arc::clone(probe),
                    Duration::from_secs(raumbang.cooldown_secs),
                )),
            );
        }
        registry.add(
            "manpages",
            Arc::new(ManpageListener::new(
                Arc::clone(identity),
                self.outbox.clone(),
                self.services.http.clone(),
                crate::handlers::DEBIAN_MANPAGES,
            )),
        );
        if let Some(lucky) = &self.lucky {
            registry.add(
                "lmgtfy",
                Arc::new(LmgtfyListener::new(self.outbox.clone(), Arc::clone(lucky))),
            );
        }
        registry.add(
            "invite",
            Arc::new(InviteListener::new(Arc::clone(identity), self.outbox.clone())),
        );
        registry.add(
            "admin",
            Arc::new(AdminListener::new(
                Arc::clone(identity),
                self.outbox.clone(),
                self.shutdown_tx.clone(),
                self.topic.clone(),
            )),
        );
        info!(listeners = registry.len(), "Listeners registered");
    }

    fn is_ignored(&self, msg: &Message) -> bool {
        msg.nick()
            .is_some_and(|nick| self.ignored_nicks.contains(&nick.to_lowercase()))
    }

    /// Entry point for every inbound message. Never blocks.
    pub fn handle_message(self: &Arc<Self>, msg: Message) {
        if self.is_ignored(&msg) {
            return;
        }

        match msg.command.as_str() {
            RPL_WELCOME => {
                let bot = Arc::clone(self);
                tokio::spawn(async move { bot.on_welcome().await });
            }
            ERR_NICKNAMEINUSE => self.on_nick_in_use(),
            _ => {}
        }

        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.run(msg).await.into_result() {
                error!(error = %e, "Dispatch failed");
            }
        });
    }

    async fn on_welcome(self: Arc<Self>) {
        info!(nick = %self.identity.nick(), "Registered with server");
        if let Some(password) = &self.config.irc.nickserv_password {
            self.identify(password).await;
        }
        for channel in &self.config.irc.channels {
            self.outbox.join(channel);
        }
        if !self.background_started.swap(true, Ordering::SeqCst) {
            self.start_background();
        }
    }

    /// Identify with nickserv and wait for the confirmation.
    async fn identify(&self, password: &str) -> bool {
        let confirmed = Correlation::register(&self.registry, "nickserv auth", |msg: &Message| {
            let from_nickserv = msg
                .nick()
                .is_some_and(|n| n.eq_ignore_ascii_case("nickserv"));
            (msg.is("NOTICE") && from_nickserv && msg.text().contains("You are now identified"))
                .then_some(())
        });
        self.outbox
            .privmsg("nickserv", &format!("identify {password}"));

        match confirmed.wait(NICKSERV_TIMEOUT).await {
            Ok(()) => {
                info!("Identified with nickserv");
                true
            }
            Err(e) => {
                warn!(error = %e, "Nickserv did not confirm identification");
                false
            }
        }
    }

    fn start_background(&self) {
        if !self.config.rss.is_empty() {
            let poller = Arc::new(FeedPoller::new(
                self.services.http.clone(),
                self.outbox.clone(),
                self.config.rss_settings.clone(),
            ));
            for feed in &self.config.rss {
                tokio::spawn(Arc::clone(&poller).run(feed.clone(), self.shutdown_tx.subscribe()));
            }
        }

        if let Some(changer) = &self.topic {
            if !self.config.topic.channels.is_empty() {
                tokio::spawn(Arc::clone(changer).run(
                    self.config.topic.channels.clone(),
                    Duration::from_secs(self.config.topic.interval_secs),
                    self.shutdown_tx.subscribe(),
                ));
            }
        }
    }

    fn on_nick_in_use(&self) {
        let nick = format!("{}_", self.identity.nick());
        warn!(nick = %nick, "Nick in use, retrying");
        self.identity.set_nick(nick.clone());
        self.outbox.send(Message::nick_change(nick));
        self.registry.reset();
        self.register_listeners();
    }

    /// Write karma and last-seen state to disk.
    pub async fn persist(&self) {
        if let Err(e) = self.services.karma.save_off_worker().await {
            error!(error = %e, "Failed to save karma");
        }
        let last_seen = Arc::clone(&self.services.last_seen);
        if let Err(e) = write_off_worker(move || last_seen.flush()).await {
            error!(error = %e, "Failed to save last-seen data");
        }
    }

    /// Register with the server and pump messages until shutdown or hangup.
    ///
    /// State is persisted and background tasks are stopped either way.
    pub async fn run<S>(
        self: Arc<Self>,
        mut connection: Connection<S>,
        outbound: mpsc::UnboundedReceiver<String>,
    ) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let span = spans::connection(&self.config.irc.server, &self.identity.nick());
        let shutdown = self.shutdown_tx.subscribe();
        let bot = Arc::clone(&self);
        let result = async {
            connection
                .register(&self.identity.nick(), &self.config.irc.realname)
                .await?;
            connection
                .run(outbound, shutdown, move |msg| bot.handle_message(msg))
                .await
        }
        .instrument(span)
        .await;

        let _ = self.shutdown_tx.send(());
        self.persist().await;
        result
    }
}
