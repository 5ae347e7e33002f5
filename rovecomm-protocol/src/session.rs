//! RoveComm session
//!
//! A [`Session`] binds one transport to one framing configuration. It is
//! polled from the application's main loop; every call does a bounded
//! amount of work and returns at once.
//!
//! ```ignore
//! let mut session = Session::open(uart, SessionConfig::default())?;
//! loop {
//!     match session.poll() {
//!         Ok(Some(msg)) => handle(msg.data_id, &msg.payload),
//!         Ok(None) => {}
//!         Err(e) => trace!("dropped frame: {:?}", e),
//!     }
//!     session.send(TELEMETRY_ID, &reading)?;
//! }
//! ```

use rovecomm_hal::SerialTransport;

use crate::assembler::{AssemblerState, FrameLimits, StreamAssembler};
use crate::config::SessionConfig;
use crate::error::{ConfigError, Error};
use crate::frame::{encode_frame, Message, MAX_FRAME_SIZE};
use crate::mode::Mode;
use crate::stats::SessionStats;
use crate::system::{Reply, SystemDispatcher, SystemMessage, PING, SUBSCRIBE, UNSUBSCRIBE};

/// A RoveComm-Serial endpoint on one transport
pub struct Session<T: SerialTransport> {
    transport: T,
    config: SessionConfig,
    assembler: StreamAssembler,
    dispatcher: SystemDispatcher,
    stats: SessionStats,
}

impl<T: SerialTransport> Session<T> {
    /// Start a session on `transport`
    ///
    /// Sizes the transport's receive buffer for the configured payload
    /// bound. Fails if the transport cannot hold a largest-payload frame.
    pub fn open(mut transport: T, config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        transport.set_buffer_length(config.buffer_length());
        let capacity = transport.buffer_capacity();
        let required = config.max_frame_len();
        if capacity < required {
            return Err(ConfigError::BufferTooSmall { capacity, required });
        }

        info!(
            "RoveComm session open: mode {:?}, max payload {}, buffer {}",
            config.mode,
            config.max_payload,
            capacity
        );

        Ok(Self {
            transport,
            assembler: StreamAssembler::new(config.mode),
            config,
            dispatcher: SystemDispatcher::new(),
            stats: SessionStats::default(),
        })
    }

    /// Fetch the next application message, if one is ready
    ///
    /// `Ok(None)` means nothing is ready yet or the frame was a system
    /// message handled internally. Errors report a dropped frame; keep
    /// polling.
    pub fn poll(&mut self) -> Result<Option<Message>, Error<T::Error>> {
        let mode = self.config.mode;
        let limits = self.limits();

        let decoded = match self
            .assembler
            .poll(&mut self.transport, limits, &mut self.stats)
        {
            Ok(Some(frame)) => Message::decode(frame, mode),
            Ok(None) => return Ok(None),
            Err(e) => {
                debug!("frame rejected: {:?}", e);
                return Err(e.into());
            }
        };

        let message = match decoded {
            Ok(message) => message,
            Err(e) => {
                self.stats.corrupt_frames = self.stats.corrupt_frames.wrapping_add(1);
                warn!("frame dropped: {:?}", e);
                return Err(e.into());
            }
        };
        self.stats.frames_received = self.stats.frames_received.wrapping_add(1);
        trace!("frame {:#x}, {} bytes", message.data_id, message.size());

        let dispatch = self.dispatcher.dispatch(message);
        if let Some(system) = dispatch.system {
            self.stats.system_messages = self.stats.system_messages.wrapping_add(1);
            if system == SystemMessage::PingReply {
                self.stats.ping_replies = self.stats.ping_replies.wrapping_add(1);
            }
            debug!("system message {:?}", system);
        }
        if let Some(ack) = dispatch.acknowledge {
            self.send_reply(ack);
        }
        if let Some(reply) = dispatch.reply {
            self.send_reply(reply);
        }

        Ok(dispatch.message)
    }

    /// Send a message with no flags set
    pub fn send(&mut self, data_id: u16, payload: &[u8]) -> Result<(), Error<T::Error>> {
        self.send_with_flags(data_id, payload, 0)
    }

    /// Send a message with explicit flags (see [`crate::FLAG_ACK_REQUESTED`])
    pub fn send_with_flags(
        &mut self,
        data_id: u16,
        payload: &[u8],
        flags: u8,
    ) -> Result<(), Error<T::Error>> {
        if payload.len() > self.config.max_payload as usize {
            return Err(Error::PayloadTooLarge);
        }
        self.transmit(data_id, payload, flags)
    }

    /// Send a prepared message
    pub fn send_message(&mut self, message: &Message) -> Result<(), Error<T::Error>> {
        self.send_with_flags(message.data_id, &message.payload, message.flags)
    }

    /// Ask the peer for a ping reply
    ///
    /// Replies are counted in [`SessionStats::ping_replies`].
    pub fn ping(&mut self) -> Result<(), Error<T::Error>> {
        self.transmit(PING, &[], 0)
    }

    /// Ask the peer to start streaming telemetry
    pub fn subscribe(&mut self) -> Result<(), Error<T::Error>> {
        self.transmit(SUBSCRIBE, &[], 0)
    }

    /// Ask the peer to stop streaming telemetry
    pub fn unsubscribe(&mut self) -> Result<(), Error<T::Error>> {
        self.transmit(UNSUBSCRIBE, &[], 0)
    }

    /// Resize the transport's receive buffer
    ///
    /// Frames longer than the new size are rejected as
    /// [`Error::FrameTooLarge`].
    pub fn set_buffer_size(&mut self, bytes: usize) {
        self.transport.set_buffer_length(bytes);
        debug!("buffer size now {}", self.transport.buffer_capacity());
    }

    /// Effective receive buffer size
    pub fn buffer_size(&self) -> usize {
        self.transport.buffer_capacity()
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn max_payload(&self) -> u8 {
        self.config.max_payload
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Resync state of the assembler
    pub fn state(&self) -> AssemblerState {
        self.assembler.state()
    }

    /// Whether the peer currently wants telemetry
    pub fn peer_subscribed(&self) -> bool {
        self.dispatcher.peer_subscribed()
    }

    /// Most recent data id the peer acknowledged
    pub fn last_acknowledged(&self) -> Option<u16> {
        self.dispatcher.last_acknowledged()
    }

    /// Take the most recent acknowledged id, clearing it
    pub fn take_acknowledged(&mut self) -> Option<u16> {
        self.dispatcher.take_acknowledged()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Close the session and hand back the transport
    pub fn release(self) -> T {
        self.transport
    }

    fn limits(&self) -> FrameLimits {
        FrameLimits {
            buffer_size: self.transport.buffer_capacity().min(MAX_FRAME_SIZE),
            max_payload: self.config.max_payload as usize,
        }
    }

    fn transmit(&mut self, data_id: u16, payload: &[u8], flags: u8) -> Result<(), Error<T::Error>> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = encode_frame(data_id, payload, flags, self.config.mode, &mut buffer)?;
        self.transport
            .write(&buffer[..len])
            .map_err(Error::Transport)?;
        self.stats.frames_sent = self.stats.frames_sent.wrapping_add(1);
        Ok(())
    }

    fn send_reply(&mut self, reply: Reply) {
        let mut payload = [0u8; 2];
        let len = reply.payload(&mut payload);
        if self.transmit(reply.data_id(), &payload[..len], 0).is_err() {
            self.stats.failed_replies = self.stats.failed_replies.wrapping_add(1);
            warn!("could not send {:?}", reply);
        }
    }
}
