//! Wrapper functions for logging events.
//!
//! Each function corresponds to one kind of milestone and carries a fixed
//! target, so a JSON log can be filtered by concern:
//!
//! | target     | emitted for                                  |
//! |------------|----------------------------------------------|
//! | `CONFIG`   | run construction and configuration hazards   |
//! | `SESSION`  | actor spawn, state transitions, terminals     |
//! | `NETWORK`  | sends, deliveries, injections, drops          |
//! | `PROPERTY` | violations found by the table monitor         |
//!
//! Installing a subscriber is left to the binary.

use crate::{
    checker::Violation,
    config::RunConfig,
    network::{ActorId, ActorTag, Envelope, Message},
    recorder::Event,
    session::{State, StallReason},
    Host,
};
use tracing::{event, Level};

pub fn run_configured(config: &RunConfig) {
    event!(
        target: "CONFIG",
        Level::INFO,
        variant = config.variant_name(),
        attacker = %config.attacker_mode(),
        hosts = ?config.host_universe(),
        "run configured",
    );
}

pub fn shared_secret_hazard(host: &Host, partners: &[Host]) {
    event!(
        target: "CONFIG",
        Level::WARN,
        host = %host,
        partners = ?partners,
        "host holds one secret with several partners",
    );
}

pub fn actor_spawned(tag: &ActorTag) {
    event!(
        target: "SESSION",
        Level::DEBUG,
        actor = tag.id,
        role = %tag.role,
        host = %tag.host,
        peer = %tag.peer,
        seed = %tag.seed,
        "spawned",
    );
}

pub fn transition(tag: &ActorTag, state: State) {
    event!(target: "SESSION", Level::TRACE, actor = tag.id, state = %state);
}

/// Inbound messages that do not match what the actor is waiting for.
pub fn shape_mismatch(tag: &ActorTag, state: State, message: &Message) {
    event!(
        target: "SESSION",
        Level::DEBUG,
        actor = tag.id,
        state = %state,
        kind = message.kind(),
        sender = %message.sender(),
        "ignored message",
    );
}

pub fn stalled(tag: &ActorTag, state: State, reason: &StallReason) {
    event!(
        target: "SESSION",
        Level::INFO,
        actor = tag.id,
        role = %tag.role,
        state = %state,
        reason = %reason,
        "stalled",
    );
}

pub fn confirmed(tag: &ActorTag, event: &Event) {
    event!(
        target: "SESSION",
        Level::INFO,
        actor = tag.id,
        role = %tag.role,
        initiator = %event.initiator,
        responder = %event.responder,
        session = %event.session,
        "confirmed",
    );
}

pub fn key_used(tag: &ActorTag, ciphertext_len: usize) {
    event!(target: "SESSION", Level::DEBUG, actor = tag.id, ciphertext_len);
}

pub fn message_sent(envelope: &Envelope) {
    event!(
        target: "NETWORK",
        Level::DEBUG,
        seq = envelope.seq,
        from = envelope.from.id,
        message = %envelope.message,
        "sent",
    );
}

pub fn message_delivered(to: ActorId, message: &Message) {
    event!(target: "NETWORK", Level::TRACE, to, message = %message, "delivered");
}

pub fn message_injected(to: ActorId, message: &Message) {
    event!(target: "NETWORK", Level::DEBUG, to, message = %message, "injected");
}

pub fn message_dropped(envelope: &Envelope, why: &str) {
    event!(
        target: "NETWORK",
        Level::DEBUG,
        seq = envelope.seq,
        from = envelope.from.id,
        why,
        "dropped",
    );
}

pub fn violation(violation: &Violation) {
    event!(
        target: "PROPERTY",
        Level::WARN,
        property = %violation.property,
        witness = %violation.witness,
    );
}
