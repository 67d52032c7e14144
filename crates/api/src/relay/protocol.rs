//! Websocket frame format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::topic::Channel;

/// Frames sent by clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe {
        channel: Channel,
    },
    Unsubscribe {
        channel: Channel,
    },
    Message {
        channel: Channel,
        #[serde(default)]
        data: Map<String, Value>,
    },
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame<'a> {
    Welcome,
    ConfirmSubscription { channel: Channel },
    RejectSubscription { channel: Channel },
    Message { channel: Channel, message: &'a Value },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_frames() {
        let subscribe: ClientFrame =
            serde_json::from_value(json!({"type": "subscribe", "channel": "command"})).unwrap();
        assert_eq!(subscribe, ClientFrame::Subscribe { channel: Channel::Command });

        let message: ClientFrame = serde_json::from_value(json!({
            "type": "message",
            "channel": "signaling",
            "data": {"payload": {"sdp": "v=0"}}
        }))
        .unwrap();
        match message {
            ClientFrame::Message { channel, data } => {
                assert_eq!(channel, Channel::Signaling);
                assert_eq!(data["payload"]["sdp"], json!("v=0"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_frames_rejected() {
        assert!(serde_json::from_value::<ClientFrame>(json!({"type": "shout"})).is_err());
        assert!(serde_json::from_value::<ClientFrame>(
            json!({"type": "subscribe", "channel": "video"})
        )
        .is_err());
    }

    #[test]
    fn test_server_frames() {
        assert_eq!(
            serde_json::to_value(ServerFrame::Welcome).unwrap(),
            json!({"type": "welcome"})
        );
        assert_eq!(
            serde_json::to_value(ServerFrame::RejectSubscription { channel: Channel::Command }).unwrap(),
            json!({"type": "reject_subscription", "channel": "command"})
        );
        let message = json!({"id": "1"});
        assert_eq!(
            serde_json::to_value(ServerFrame::Message {
                channel: Channel::Command,
                message: &message
            })
            .unwrap(),
            json!({"type": "message", "channel": "command", "message": {"id": "1"}})
        );
    }
}
