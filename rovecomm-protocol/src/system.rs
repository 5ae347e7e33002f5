//! System messages
//!
//! Data ids `0x0001..=0x0006` are reserved for the protocol itself. The
//! [`SystemDispatcher`] looks at every decoded message, decides which
//! replies the session has to send, and hides reserved-id traffic from the
//! application.

use crate::frame::Message;

/// Sentinel id meaning "no message"
pub const NO_MESSAGE: u16 = 0x0000;
pub const PING: u16 = 0x0001;
pub const PING_REPLY: u16 = 0x0002;
pub const SUBSCRIBE: u16 = 0x0003;
pub const UNSUBSCRIBE: u16 = 0x0004;
pub const FORCE_UNSUBSCRIBE: u16 = 0x0005;
/// Payload is the acknowledged data id, big-endian
///
/// Peers that copy the id out of memory on a little-endian MCU put it on
/// the wire byte-swapped; their acknowledges read back reversed here.
pub const ACKNOWLEDGE: u16 = 0x0006;

/// Payload of a ping reply
pub const PING_REPLY_PAYLOAD: [u8; 1] = [0];

/// Messages handled by the protocol layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemMessage {
    Ping,
    PingReply,
    Subscribe,
    Unsubscribe,
    ForceUnsubscribe,
    Acknowledge,
}

impl SystemMessage {
    /// Classify a data id; `None` for application ids
    pub fn from_data_id(data_id: u16) -> Option<Self> {
        match data_id {
            PING => Some(SystemMessage::Ping),
            PING_REPLY => Some(SystemMessage::PingReply),
            SUBSCRIBE => Some(SystemMessage::Subscribe),
            UNSUBSCRIBE => Some(SystemMessage::Unsubscribe),
            FORCE_UNSUBSCRIBE => Some(SystemMessage::ForceUnsubscribe),
            ACKNOWLEDGE => Some(SystemMessage::Acknowledge),
            _ => None,
        }
    }

    /// Wire id of this message
    pub fn data_id(self) -> u16 {
        match self {
            SystemMessage::Ping => PING,
            SystemMessage::PingReply => PING_REPLY,
            SystemMessage::Subscribe => SUBSCRIBE,
            SystemMessage::Unsubscribe => UNSUBSCRIBE,
            SystemMessage::ForceUnsubscribe => FORCE_UNSUBSCRIBE,
            SystemMessage::Acknowledge => ACKNOWLEDGE,
        }
    }
}

/// Reply the session must transmit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Acknowledge carrying the acknowledged data id
    Acknowledge(u16),
    /// Answer to a ping
    PingReply,
}

impl Reply {
    /// Data id of the reply frame
    pub fn data_id(&self) -> u16 {
        match self {
            Reply::Acknowledge(_) => ACKNOWLEDGE,
            Reply::PingReply => PING_REPLY,
        }
    }

    /// Write the reply payload into `buf`, returning its length
    pub fn payload(&self, buf: &mut [u8; 2]) -> usize {
        match self {
            Reply::Acknowledge(id) => {
                // Same byte order as the header's data id
                *buf = id.to_be_bytes();
                2
            }
            Reply::PingReply => {
                buf[..1].copy_from_slice(&PING_REPLY_PAYLOAD);
                1
            }
        }
    }
}

/// Result of dispatching one decoded message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// Acknowledge to send first, if the sender asked for one
    pub acknowledge: Option<Reply>,
    /// Protocol reply to send afterwards
    pub reply: Option<Reply>,
    /// Application message to hand to the caller
    pub message: Option<Message>,
    /// Set when the message was a system message
    pub system: Option<SystemMessage>,
}

/// Interprets reserved-id messages and tracks the peer's protocol state
#[derive(Debug, Clone, Default)]
pub struct SystemDispatcher {
    peer_subscribed: bool,
    last_acknowledged: Option<u16>,
}

impl SystemDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the peer has subscribed and not unsubscribed since
    pub fn peer_subscribed(&self) -> bool {
        self.peer_subscribed
    }

    /// Most recent data id the peer acknowledged
    pub fn last_acknowledged(&self) -> Option<u16> {
        self.last_acknowledged
    }

    /// Take the most recent acknowledged id, clearing it
    pub fn take_acknowledged(&mut self) -> Option<u16> {
        self.last_acknowledged.take()
    }

    /// Decide what to do with a decoded message
    ///
    /// A message with the [`NO_MESSAGE`] id produces an empty dispatch.
    pub fn dispatch(&mut self, message: Message) -> Dispatch {
        if message.data_id == NO_MESSAGE {
            return Dispatch::default();
        }

        let acknowledge = message
            .ack_requested()
            .then_some(Reply::Acknowledge(message.data_id));

        let Some(system) = SystemMessage::from_data_id(message.data_id) else {
            return Dispatch {
                acknowledge,
                message: Some(message),
                ..Dispatch::default()
            };
        };

        let reply = match system {
            SystemMessage::Ping => Some(Reply::PingReply),
            SystemMessage::Subscribe => {
                self.peer_subscribed = true;
                None
            }
            SystemMessage::Unsubscribe | SystemMessage::ForceUnsubscribe => {
                self.peer_subscribed = false;
                None
            }
            SystemMessage::Acknowledge => {
                if let [msb, lsb, ..] = message.payload[..] {
                    self.last_acknowledged = Some(u16::from_be_bytes([msb, lsb]));
                }
                None
            }
            SystemMessage::PingReply => None,
        };

        Dispatch {
            acknowledge,
            reply,
            message: None,
            system: Some(system),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FLAG_ACK_REQUESTED;

    #[test]
    fn test_classify_reserved_ids() {
        for id in PING..=ACKNOWLEDGE {
            let system = SystemMessage::from_data_id(id).unwrap();
            assert_eq!(system.data_id(), id);
        }
        assert_eq!(SystemMessage::from_data_id(NO_MESSAGE), None);
        assert_eq!(SystemMessage::from_data_id(0x0007), None);
        assert_eq!(SystemMessage::from_data_id(1296), None);
    }

    #[test]
    fn test_application_message_passes_through() {
        let mut dispatcher = SystemDispatcher::new();
        let msg = Message::new(1296, &[1, 2]).unwrap();

        let dispatch = dispatcher.dispatch(msg.clone());
        assert_eq!(dispatch.message, Some(msg));
        assert_eq!(dispatch.acknowledge, None);
        assert_eq!(dispatch.reply, None);
        assert_eq!(dispatch.system, None);
    }

    #[test]
    fn test_ping_is_answered_and_suppressed() {
        let mut dispatcher = SystemDispatcher::new();
        let dispatch = dispatcher.dispatch(Message::empty(PING));

        assert_eq!(dispatch.reply, Some(Reply::PingReply));
        assert_eq!(dispatch.message, None);
        assert_eq!(dispatch.system, Some(SystemMessage::Ping));
    }

    #[test]
    fn test_silent_system_messages() {
        let mut dispatcher = SystemDispatcher::new();
        for id in [PING_REPLY, SUBSCRIBE, UNSUBSCRIBE, FORCE_UNSUBSCRIBE, ACKNOWLEDGE] {
            let dispatch = dispatcher.dispatch(Message::new(id, &[0, 0]).unwrap());
            assert_eq!(dispatch.reply, None, "id {}", id);
            assert_eq!(dispatch.message, None, "id {}", id);
        }
    }

    #[test]
    fn test_ack_requested_on_application_message() {
        let mut dispatcher = SystemDispatcher::new();
        let msg = Message::with_flags(0x0190, &[7], FLAG_ACK_REQUESTED).unwrap();

        let dispatch = dispatcher.dispatch(msg.clone());
        assert_eq!(dispatch.acknowledge, Some(Reply::Acknowledge(0x0190)));
        assert_eq!(dispatch.message, Some(msg));
    }

    #[test]
    fn test_ack_requested_on_ping() {
        let mut dispatcher = SystemDispatcher::new();
        let msg = Message::with_flags(PING, &[], FLAG_ACK_REQUESTED).unwrap();

        let dispatch = dispatcher.dispatch(msg);
        assert_eq!(dispatch.acknowledge, Some(Reply::Acknowledge(PING)));
        assert_eq!(dispatch.reply, Some(Reply::PingReply));
    }

    #[test]
    fn test_flags_other_than_bit_zero_do_not_ack() {
        let mut dispatcher = SystemDispatcher::new();
        let dispatch = dispatcher.dispatch(Message::with_flags(500, &[], 0xFE).unwrap());
        assert_eq!(dispatch.acknowledge, None);
    }

    #[test]
    fn test_no_message_sentinel() {
        let mut dispatcher = SystemDispatcher::new();
        let dispatch = dispatcher.dispatch(Message::with_flags(NO_MESSAGE, &[], 1).unwrap());
        assert_eq!(dispatch, Dispatch::default());
    }

    #[test]
    fn test_subscription_tracking() {
        let mut dispatcher = SystemDispatcher::new();
        assert!(!dispatcher.peer_subscribed());

        dispatcher.dispatch(Message::empty(SUBSCRIBE));
        assert!(dispatcher.peer_subscribed());

        dispatcher.dispatch(Message::empty(UNSUBSCRIBE));
        assert!(!dispatcher.peer_subscribed());

        dispatcher.dispatch(Message::empty(SUBSCRIBE));
        dispatcher.dispatch(Message::empty(FORCE_UNSUBSCRIBE));
        assert!(!dispatcher.peer_subscribed());
    }

    #[test]
    fn test_acknowledge_records_id() {
        let mut dispatcher = SystemDispatcher::new();
        dispatcher.dispatch(Message::new(ACKNOWLEDGE, &[0x01, 0x90]).unwrap());

        assert_eq!(dispatcher.last_acknowledged(), Some(0x0190));
        assert_eq!(dispatcher.take_acknowledged(), Some(0x0190));
        assert_eq!(dispatcher.take_acknowledged(), None);

        // Short payload is ignored
        dispatcher.dispatch(Message::new(ACKNOWLEDGE, &[0x01]).unwrap());
        assert_eq!(dispatcher.last_acknowledged(), None);
    }

    #[test]
    fn test_reply_payloads() {
        let mut buf = [0u8; 2];
        assert_eq!(Reply::Acknowledge(0xABCD).payload(&mut buf), 2);
        assert_eq!(buf, [0xAB, 0xCD]);
        assert_eq!(Reply::PingReply.payload(&mut buf), 1);
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn test_native_order_acknowledge_reads_swapped() {
        let mut dispatcher = SystemDispatcher::new();
        let id: u16 = 0x0190;
        dispatcher.dispatch(Message::new(ACKNOWLEDGE, &id.to_le_bytes()).unwrap());
        assert_eq!(dispatcher.last_acknowledged(), Some(0x9001));
    }
}
