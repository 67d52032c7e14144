//! Subscription wiring and permission-gated forwarding.

use std::sync::Arc;

use chrono::Utc;
use domain::models::{Capabilities, Capability, ClientRole};
use domain::services::{resolve_access, CommandPolicy, PolicyDecision, Stores};
use domain::StoreError;
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::bus::{ConnectionId, Delivery, RelayBus};
use super::envelope::{command_envelope, response_envelope, signaling_envelope, Inbound};
use super::topic::{Channel, Topic};
use crate::config::RelayConfig;
use crate::services::{ConnectionIdentity, Gatekeeper, HandshakeError};

/// Why an inbound message was not forwarded. Never reported to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingCommand,
    NoDevice,
    NoAccess,
    Unmatched,
    CapabilityDenied(Capability),
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingCommand => "missing_command",
            DropReason::NoDevice => "no_device",
            DropReason::NoAccess => "no_access",
            DropReason::Unmatched => "unmatched_command",
            DropReason::CapabilityDenied(_) => "capability_denied",
        }
    }
}

/// What a non-owner needs before a message is forwarded.
enum Gate<'a> {
    /// Classified through the command policy.
    Command(&'a str),
    Capability(Capability),
}

impl Gate<'_> {
    fn check(&self, policy: &CommandPolicy, caps: &Capabilities) -> Option<DropReason> {
        match self {
            Gate::Command(command) => match policy.evaluate(command, caps) {
                PolicyDecision::Allowed(_) => None,
                PolicyDecision::Denied(cap) => Some(DropReason::CapabilityDenied(cap)),
                PolicyDecision::Unmatched => Some(DropReason::Unmatched),
            },
            Gate::Capability(cap) if caps.allows(*cap) => None,
            Gate::Capability(cap) => Some(DropReason::CapabilityDenied(*cap)),
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Forwarded { topic: Topic, delivered: usize },
    Dropped(DropReason),
}

/// Routes traffic between desktop inboxes and viewer return channels.
#[derive(Debug, Clone)]
pub struct Relay {
    bus: RelayBus,
    gatekeeper: Gatekeeper,
    stores: Stores,
    policy: Arc<CommandPolicy>,
    passthrough_prefixes: Arc<[String]>,
}

impl Relay {
    pub fn new(bus: RelayBus, gatekeeper: Gatekeeper, stores: Stores, config: &RelayConfig) -> Self {
        Self {
            bus,
            gatekeeper,
            stores,
            policy: Arc::new(CommandPolicy::default()),
            passthrough_prefixes: config.passthrough_prefixes.clone().into(),
        }
    }

    pub fn bus(&self) -> &RelayBus {
        &self.bus
    }

    /// Authorizes and registers the connection's inbox for `channel`.
    pub async fn subscribe(
        &self,
        identity: &ConnectionIdentity,
        channel: Channel,
        connection: ConnectionId,
        sender: mpsc::Sender<Delivery>,
    ) -> Result<Topic, HandshakeError> {
        if let Err(e) = self.gatekeeper.authorize_subscription(identity).await {
            warn!(
                user_id = %identity.user.id,
                channel = %channel,
                reason = e.reason(),
                "Subscription rejected"
            );
            return Err(e);
        }
        let topic = Topic::inbox(channel, identity).ok_or(HandshakeError::MissingDevice)?;
        self.bus.subscribe(topic.clone(), connection, sender);
        info!(user_id = %identity.user.id, topic = %topic, "Subscription confirmed");
        Ok(topic)
    }

    pub fn unsubscribe(&self, identity: &ConnectionIdentity, channel: Channel, connection: ConnectionId) {
        if let Some(topic) = Topic::inbox(channel, identity) {
            self.bus.unsubscribe(&topic, connection);
        }
    }

    pub fn disconnect(&self, connection: ConnectionId) {
        self.bus.disconnect(connection);
    }

    /// Classifies and forwards one inbound message.
    ///
    /// Store failures abort this message only.
    pub async fn dispatch(
        &self,
        identity: &ConnectionIdentity,
        channel: Channel,
        inbound: Inbound,
    ) -> Result<Dispatch, StoreError> {
        let outcome = match identity.role {
            ClientRole::Web => self.from_viewer(identity, channel, inbound).await?,
            ClientRole::Desktop => self.from_desktop(identity, channel, inbound),
        };

        match &outcome {
            Dispatch::Forwarded { topic, delivered } => {
                counter!(
                    "relay_messages_forwarded_total",
                    "channel" => channel.as_str(),
                    "direction" => direction(identity.role)
                )
                .increment(1);
                debug!(topic = %topic, delivered, "Message forwarded");
            }
            Dispatch::Dropped(reason) => {
                counter!(
                    "relay_messages_dropped_total",
                    "channel" => channel.as_str(),
                    "reason" => reason.as_str()
                )
                .increment(1);
                debug!(
                    user_id = %identity.user.id,
                    channel = %channel,
                    reason = reason.as_str(),
                    "Message dropped"
                );
            }
        }
        Ok(outcome)
    }

    async fn from_viewer(
        &self,
        identity: &ConnectionIdentity,
        channel: Channel,
        inbound: Inbound,
    ) -> Result<Dispatch, StoreError> {
        let Some(target) = identity.target_device.as_ref() else {
            return Ok(Dispatch::Dropped(DropReason::NoDevice));
        };
        let sender_name = identity.user.username.as_str();

        let (gate, envelope) = match channel {
            Channel::Command => {
                let Some(command) = inbound.command() else {
                    return Ok(Dispatch::Dropped(DropReason::MissingCommand));
                };
                (Gate::Command(command), command_envelope(sender_name, command, &inbound))
            }
            Channel::Signaling => (
                Gate::Capability(Capability::SeeScreen),
                signaling_envelope(sender_name, &inbound),
            ),
        };

        if !identity.is_device_owner() {
            // Shares can change while connected, so read the grant per message.
            let grant = resolve_access(&self.stores, identity.user.id, target, Utc::now()).await?;
            let Some(access) = grant else {
                return Ok(Dispatch::Dropped(DropReason::NoAccess));
            };
            if let Some(caps) = access.capabilities() {
                if let Some(reason) = gate.check(&self.policy, caps) {
                    return Ok(Dispatch::Dropped(reason));
                }
            }
        }

        let topic = Topic::device(channel, target.id);
        let delivered = self.bus.publish(&topic, channel, envelope);
        Ok(Dispatch::Forwarded { topic, delivered })
    }

    fn from_desktop(&self, identity: &ConnectionIdentity, channel: Channel, inbound: Inbound) -> Dispatch {
        let Some(device) = identity.device.as_ref() else {
            return Dispatch::Dropped(DropReason::NoDevice);
        };
        // Responses only ever reach the owner's return channel.
        let topic = Topic::viewer(channel, device.user_id, device.id);

        let message = match channel {
            Channel::Command if self.is_passthrough(inbound.command()) => inbound.into_value(),
            Channel::Command => response_envelope(&inbound),
            Channel::Signaling => signaling_envelope(&device.name, &inbound),
        };

        let delivered = self.bus.publish(&topic, channel, message);
        Dispatch::Forwarded { topic, delivered }
    }

    fn is_passthrough(&self, command: Option<&str>) -> bool {
        command.is_some_and(|command| {
            self.passthrough_prefixes
                .iter()
                .any(|prefix| command.starts_with(prefix.as_str()))
        })
    }
}

fn direction(role: ClientRole) -> &'static str {
    match role {
        ClientRole::Web => "to_device",
        ClientRole::Desktop => "to_viewer",
    }
}
