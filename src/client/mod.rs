//! Cloud client task.
//!
//! Publishes fan telemetry to the cloud MQTT bridge and applies the
//! configuration messages the cloud sends back. The MQTT session itself
//! belongs to a [`Cloud`] implementation; the password is a JWT produced by
//! a [`TokenSigner`] backed by the crypto device.
//!
//! # States
//!
//! ```text
//! Init ──▶ GetTime ──▶ Connect ──▶ Run
//!  ▲          │ wait for        │ retry      │ publish every update period,
//!  │          │ network time    │ every 10 s │ otherwise poll for messages
//!  └── Error ◀┴─────────────────┴────────────┘ (network error ▶ Init)
//! ```
//!
//! Waits use a [`Holdoff`] the scheduler ticks, so the task never blocks.

use core::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::config::{self, CloudConfig};
use crate::sensor::{self, FanControl, SpeedMap, MAP_ENTRIES_MAX};
use crate::system::holdoff::Holdoff;
use crate::system::scheduler::Task;
use crate::system::time::Clock;

/// Wait between network time requests.
pub const TIME_WAIT_MS: u32 = 10_000;

/// Wait between connection attempts.
pub const CONNECT_RETRY_MS: u32 = 10_000;

/// Telemetry period until the cloud sets another.
pub const REPORT_PERIOD_DEFAULT_MS: u32 = 10_000;

/// Update rates at or below this are ignored.
pub const UPDATE_RATE_MIN_MS: u32 = 1000;

/// Validity of a connection token.
pub const TOKEN_LIFETIME_S: u32 = 86_400;

/// MQTT keep-alive interval.
pub const KEEP_ALIVE_S: u16 = 60;

/// Capacity for a signed token.
pub const TOKEN_SIZE_MAX: usize = 512;

/// Capacity for telemetry and configuration messages.
pub const MESSAGE_SIZE_MAX: usize = 256;

/// Client errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The network or MQTT session failed.
    Network,
    /// The cloud identity is unusable.
    Config(config::Error),
    /// The token could not be signed.
    Token,
    /// A message did not fit its buffer.
    Serialize,
    /// A configuration message was not valid JSON.
    Parse,
    /// Fan control failed.
    Sensor(sensor::Error),
}

impl From<config::Error> for Error {
    fn from(err: config::Error) -> Self {
        Error::Config(err)
    }
}

impl From<sensor::Error> for Error {
    fn from(err: sensor::Error) -> Self {
        Error::Sensor(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Network => defmt::write!(f, "Network"),
            Error::Config(err) => defmt::write!(f, "Config({})", err),
            Error::Token => defmt::write!(f, "Token"),
            Error::Serialize => defmt::write!(f, "Serialize"),
            Error::Parse => defmt::write!(f, "Parse"),
            Error::Sensor(err) => defmt::write!(f, "Sensor({})", err),
        }
    }
}

/// MQTT connect parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions<'a> {
    /// Client id.
    pub client_id: &'a str,
    /// User name.
    pub username: &'a str,
    /// Password, a signed token.
    pub password: &'a str,
    /// Keep-alive interval in seconds.
    pub keep_alive_s: u16,
    /// Start without session state.
    pub clean_session: bool,
}

/// Network and MQTT session owned by the board.
pub trait Cloud {
    /// Ask the network for the current time; the answer sets the clock.
    fn request_time(&mut self);

    /// Resolve `host` and open a TLS socket to it.
    fn open_socket(&mut self, host: &str, port: u16) -> Result<(), Error>;

    /// Open the MQTT session.
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Error>;

    /// Subscribe to `topic` at QoS 1.
    fn subscribe(&mut self, topic: &str) -> Result<(), Error>;

    /// Publish `payload` to `topic` at QoS 1.
    fn publish(&mut self, topic: &str, message_id: u16, payload: &[u8]) -> Result<(), Error>;

    /// Copy the next received message into `buffer`, if any.
    fn poll_message(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Error>;

    /// Whether the network dropped since the session was opened.
    fn has_error(&self) -> bool;
}

/// JWT claims for the MQTT password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Claims<'a> {
    /// Issued at, UTC seconds.
    pub iat: u32,
    /// Expiry, UTC seconds.
    pub exp: u32,
    /// Audience, the cloud project.
    pub aud: &'a str,
}

impl<'a> Claims<'a> {
    /// Claims for a token issued at `now` for `project`.
    pub fn new(now: u32, project: &'a str) -> Self {
        Self {
            iat: now,
            exp: now.saturating_add(TOKEN_LIFETIME_S),
            aud: project,
        }
    }

    /// Serialize the claims object into `buffer`.
    pub fn to_json(&self, buffer: &mut [u8]) -> Result<usize, Error> {
        serde_json_core::to_slice(self, buffer).map_err(|_| Error::Serialize)
    }
}

/// Signs connection tokens, usually with the crypto device's private key.
pub trait TokenSigner {
    /// Write an encoded, signed token for `claims` into `out`.
    fn sign(&mut self, claims: &Claims<'_>, out: &mut [u8]) -> Result<usize, Error>;
}

#[derive(Serialize)]
struct Telemetry {
    timestamp: u32,
    temperature: f32,
    #[serde(rename = "fan-speed")]
    fan_speed: u16,
}

#[derive(Debug, Deserialize)]
struct Override {
    #[serde(rename = "fan-speed")]
    fan_speed: u16,
    duration: u32,
}

#[derive(Debug, Deserialize)]
struct ConfigMessage {
    #[serde(rename = "fan-speed-map", default)]
    fan_speed_map: Option<heapless::Vec<[u32; 2], MAP_ENTRIES_MAX>>,
    #[serde(rename = "override", default)]
    speed_override: Option<Override>,
    #[serde(rename = "update-rate", default)]
    update_rate: Option<u32>,
}

/// Client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Reset session settings.
    Init,
    /// Wait until the clock is set.
    GetTime,
    /// Open the socket and the MQTT session.
    Connect,
    /// Publish telemetry and handle messages.
    Run,
    /// Start over.
    Error,
}

/// The cloud client task.
#[derive(Debug)]
pub struct ClientTask<'a, N, S, C, F> {
    state: State,
    wait: &'a Holdoff,
    config: CloudConfig<'a>,
    cloud: N,
    signer: S,
    clock: C,
    fan: &'a RefCell<F>,
    update_period_ms: u32,
    message_id: u16,
}

impl<'a, N, S, C, F> ClientTask<'a, N, S, C, F>
where
    N: Cloud,
    S: TokenSigner,
    C: Clock,
    F: FanControl,
{
    /// A client in [`State::Init`].
    ///
    /// `wait` must be ticked by the scheduler.
    pub fn new(
        config: CloudConfig<'a>,
        cloud: N,
        signer: S,
        clock: C,
        fan: &'a RefCell<F>,
        wait: &'a Holdoff,
    ) -> Self {
        Self {
            state: State::Init,
            wait,
            config,
            cloud,
            signer,
            clock,
            fan,
            update_period_ms: REPORT_PERIOD_DEFAULT_MS,
            message_id: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Current telemetry period.
    pub fn update_period_ms(&self) -> u32 {
        self.update_period_ms
    }

    /// The network session.
    pub fn cloud(&self) -> &N {
        &self.cloud
    }

    /// The network session, mutably.
    pub fn cloud_mut(&mut self) -> &mut N {
        &mut self.cloud
    }

    /// Run one state machine step.
    pub fn step(&mut self) {
        match self.state {
            State::Init => {
                self.update_period_ms = REPORT_PERIOD_DEFAULT_MS;
                self.enter(State::GetTime, 0);
            }
            State::GetTime => {
                if self.wait.is_held() {
                    return;
                }
                if self.clock.utc() == 0 {
                    self.cloud.request_time();
                    self.wait.arm(TIME_WAIT_MS);
                } else {
                    self.enter(State::Connect, 0);
                }
            }
            State::Connect => {
                if self.wait.is_held() {
                    return;
                }
                self.wait.arm(CONNECT_RETRY_MS);
                match self.connect() {
                    Ok(()) => self.enter(State::Run, 0),
                    Err(Error::Config(err)) => {
                        warn!("client: bad identity: {}", err);
                        self.enter(State::Error, 0);
                    }
                    Err(err) => warn!("client: connect failed: {}", err),
                }
            }
            State::Run => {
                if self.cloud.has_error() {
                    self.enter(State::Init, 0);
                    return;
                }
                if !self.wait.is_held() {
                    self.wait.arm(self.update_period_ms);
                    if let Err(err) = self.publish_telemetry() {
                        warn!("client: publish failed: {}", err);
                    }
                } else {
                    self.receive();
                }
            }
            State::Error => self.enter(State::Init, 0),
        }
    }

    /// Apply a configuration message from the cloud.
    ///
    /// Recognised members are `fan-speed-map` (`[[degrees, rpm], ...]`),
    /// `override` (`{"fan-speed": rpm, "duration": seconds}`) and
    /// `update-rate` (milliseconds, ignored unless above
    /// [`UPDATE_RATE_MIN_MS`]).
    pub fn apply_config(&mut self, json: &[u8]) -> Result<(), Error> {
        let (message, _) =
            serde_json_core::from_slice::<ConfigMessage>(json).map_err(|_| Error::Parse)?;

        if let Some(map) = message.fan_speed_map {
            self.fan.borrow_mut().set_speed_map(SpeedMap::from_degrees(&map));
        }
        if let Some(speed) = message.speed_override {
            let until = self.clock.utc().saturating_add(speed.duration);
            self.fan.borrow_mut().set_override(speed.fan_speed, until);
        }
        if let Some(rate) = message.update_rate {
            if rate > UPDATE_RATE_MIN_MS {
                self.update_period_ms = rate;
            }
        }
        Ok(())
    }

    fn enter(&mut self, next: State, wait_ms: u32) {
        debug!("client: state {} -> {}", self.state as u8, next as u8);
        self.state = next;
        self.wait.arm(wait_ms);
    }

    fn connect(&mut self) -> Result<(), Error> {
        let client_id = self.config.client_id()?;
        let topic = self.config.subscribe_topic()?;

        self.cloud.open_socket(self.config.host, self.config.port)?;

        let claims = Claims::new(self.clock.utc(), self.config.project_id);
        let mut token = [0u8; TOKEN_SIZE_MAX];
        let len = self.signer.sign(&claims, &mut token)?;
        let password = token
            .get(..len)
            .and_then(|token| core::str::from_utf8(token).ok())
            .ok_or(Error::Token)?;

        self.cloud.connect(&ConnectOptions {
            client_id: &client_id,
            username: self.config.username(),
            password,
            keep_alive_s: KEEP_ALIVE_S,
            clean_session: true,
        })?;
        self.cloud.subscribe(&topic)?;

        info!("client: connected");
        Ok(())
    }

    fn publish_telemetry(&mut self) -> Result<(), Error> {
        let timestamp = self.clock.utc();
        let (temperature, fan_speed) = {
            let mut fan = self.fan.borrow_mut();
            (fan.temperature()?, fan.fan_speed()?)
        };

        let telemetry = Telemetry {
            timestamp,
            temperature: temperature as f32 / 1000.0,
            fan_speed,
        };
        let mut payload = [0u8; MESSAGE_SIZE_MAX];
        let len = serde_json_core::to_slice(&telemetry, &mut payload).map_err(|_| Error::Serialize)?;

        let topic = self.config.publish_topic()?;
        let id = self.next_message_id();
        self.cloud.publish(&topic, id, &payload[..len])
    }

    fn receive(&mut self) {
        let mut message = [0u8; MESSAGE_SIZE_MAX];
        match self.cloud.poll_message(&mut message) {
            Ok(Some(len)) => {
                let len = len.min(MESSAGE_SIZE_MAX);
                if let Err(err) = self.apply_config(&message[..len]) {
                    warn!("client: config message rejected: {}", err);
                }
            }
            Ok(None) => {}
            Err(err) => warn!("client: receive failed: {}", err),
        }
    }

    fn next_message_id(&mut self) -> u16 {
        self.message_id = next_message_id(self.message_id);
        self.message_id
    }
}

/// Packet identifiers run from 1 and wrap before `u16::MAX - 1`.
fn next_message_id(current: u16) -> u16 {
    match current.wrapping_add(1) {
        id if id >= u16::MAX - 1 || id == 0 => 1,
        id => id,
    }
}

impl<N, S, C, F> Task for ClientTask<'_, N, S, C, F>
where
    N: Cloud,
    S: TokenSigner,
    C: Clock,
    F: FanControl,
{
    fn poll(&mut self) {
        self.step();
    }
}
