// Sample sources: the pull (HTTP poll) and push (websocket) transports
//
// Both yield the same `FeedEvent`s so the controller never needs to know
// which transport is running. Only one transport session exists at a time.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval, sleep_until};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use super::error::{FeedError, Result};
use crate::config::{MonitorConfig, SourceConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What a source hands to the controller
#[derive(Debug)]
pub enum FeedEvent {
    /// A transport session is up
    Connected,
    /// One raw JSON payload, not yet validated
    Payload(String),
    /// The transport failed; the session is gone
    TransportError(FeedError),
}

/// Reconnect delay: starts at `initial`, doubles up to `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            current: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Pull feed: GET the endpoint on a fixed interval
pub struct PollSource {
    client: reqwest::Client,
    url: String,
    tick: Interval,
    up: bool,
    pending: Option<String>,
}

impl PollSource {
    /// Must be called inside a tokio runtime
    pub fn new(url: impl Into<String>, period: Duration) -> Self {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            tick,
            up: false,
            pending: None,
        }
    }

    async fn fetch(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Wait for the next tick and fetch one sample.
    ///
    /// A failure is reported once per tick; the timer keeps running.
    pub async fn next_event(&mut self) -> FeedEvent {
        if let Some(body) = self.pending.take() {
            return FeedEvent::Payload(body);
        }

        self.tick.tick().await;
        match self.fetch().await {
            Ok(body) if self.up => FeedEvent::Payload(body),
            Ok(body) => {
                info!("Poll endpoint {} responding", self.url);
                self.up = true;
                self.pending = Some(body);
                FeedEvent::Connected
            }
            Err(err) => {
                self.up = false;
                FeedEvent::TransportError(err)
            }
        }
    }
}

/// Push feed: persistent websocket, reconnected with backoff when it drops
pub struct PushSource {
    url: String,
    stream: Option<WsStream>,
    backoff: Backoff,
    reconnect_at: Option<Instant>,
}

impl PushSource {
    pub fn new(url: impl Into<String>, backoff: Backoff) -> Self {
        Self {
            url: url.into(),
            stream: None,
            backoff,
            reconnect_at: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Deadline of the scheduled reconnect, if one is pending
    pub fn pending_reconnect(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Cancel a pending reconnect timer so the next call connects immediately.
    ///
    /// The session lives in a single `Option`, so superseding the timer can
    /// never leave two connections open.
    pub fn reconnect_now(&mut self) {
        if self.reconnect_at.take().is_some() {
            debug!("Pending reconnect superseded");
        }
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.backoff.next_delay();
        debug!("Reconnecting to {} in {:?}", self.url, delay);
        self.reconnect_at = Some(Instant::now() + delay);
    }

    fn drop_session(&mut self) {
        self.stream = None;
        self.schedule_reconnect();
    }

    /// Wait for the next frame, connecting first if there is no session.
    ///
    /// The reconnect deadline is stored rather than slept inline, so
    /// dropping this future mid-wait keeps the schedule intact.
    pub async fn next_event(&mut self) -> FeedEvent {
        loop {
            let Some(stream) = self.stream.as_mut() else {
                if let Some(at) = self.reconnect_at {
                    sleep_until(at).await;
                }
                return match connect_async(self.url.as_str()).await {
                    Ok((stream, _)) => {
                        info!("Websocket connected to {}", self.url);
                        self.stream = Some(stream);
                        self.reconnect_at = None;
                        self.backoff.reset();
                        FeedEvent::Connected
                    }
                    Err(err) => {
                        self.schedule_reconnect();
                        FeedEvent::TransportError(err.into())
                    }
                };
            };

            let next = stream.next().await;
            match next {
                Some(Ok(Message::Text(text))) => return FeedEvent::Payload(text.to_string()),
                Some(Ok(Message::Close(_))) | None => {
                    self.drop_session();
                    return FeedEvent::TransportError(FeedError::Closed);
                }
                Some(Err(err)) => {
                    self.drop_session();
                    return FeedEvent::TransportError(err.into());
                }
                // Ping/pong are handled by tungstenite, binary frames are not ours
                Some(Ok(_)) => {}
            }
        }
    }
}

/// The configured acquisition variant
pub enum SampleSource {
    Poll(PollSource),
    Push(PushSource),
}

impl SampleSource {
    /// Must be called inside a tokio runtime
    pub fn from_config(config: &MonitorConfig) -> Self {
        match &config.source {
            SourceConfig::Poll { url, interval, .. } => {
                SampleSource::Poll(PollSource::new(url.clone(), *interval))
            }
            SourceConfig::Push { url, .. } => SampleSource::Push(PushSource::new(
                url.clone(),
                Backoff::new(config.reconnect_delay, config.max_reconnect_delay),
            )),
        }
    }

    /// Supersede a pending push reconnect. The poll timer never waits on one.
    pub fn reconnect_now(&mut self) {
        if let SampleSource::Push(source) = self {
            source.reconnect_now();
        }
    }

    pub async fn next_event(&mut self) -> FeedEvent {
        match self {
            SampleSource::Poll(source) => source.next_event().await,
            SampleSource::Push(source) => source.next_event().await,
        }
    }
}
