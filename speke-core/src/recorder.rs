//! The append-only record of protocol milestones.
//!
//! Events and detection rows share one sequence counter, so "earlier" is a
//! total order over everything the recorder has ever seen. Nothing is ever
//! updated or removed once appended.

use crate::{
    algebra::Element,
    checker::TableMonitor,
    material::{Key, SessionId},
    network::{ActorId, ActorTag},
    Host, Role,
};
use dashmap::DashMap;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    End,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Start => f.write_str("start"),
            EventKind::End => f.write_str("end"),
        }
    }
}

/// A lifecycle milestone of one session actor.
///
/// A start is recorded just before the actor puts its share on the wire and
/// an end once it has confirmed a key. An end is justified by a start from
/// the peer role that names the same two hosts and the share the ending
/// actor accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub kind: EventKind,
    pub role: Role,
    pub actor: ActorId,
    pub initiator: Host,
    pub responder: Host,
    /// The seed for a start, the session the actor settled on for an end.
    pub session: SessionId,
    /// The actor's own share for a start, the peer share it accepted for
    /// an end.
    pub share: Element,
    /// Only ends carry a key.
    pub key: Option<Key>,
}

impl Event {
    /// The values an end must find in the start that justifies it.
    pub fn parameters(&self) -> (&Host, &Host, &Element) {
        (&self.initiator, &self.responder, &self.share)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {}(actor {}, {}, {}, {}, {:?})",
            self.seq,
            self.role,
            self.kind,
            self.actor,
            self.initiator,
            self.responder,
            self.session,
            self.share
        )?;
        if let Some(key) = &self.key {
            write!(f, " key {key}")?;
        }
        Ok(())
    }
}

/// What one role believes about a run it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionRow {
    pub seq: u64,
    pub role: Role,
    pub actor: ActorId,
    pub initiator: Host,
    pub responder: Host,
    pub session: SessionId,
    pub key: Key,
}

impl fmt::Display for DetectionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} row(actor {}, {}, {}, {}, {})",
            self.seq, self.role, self.actor, self.initiator, self.responder, self.session, self.key
        )
    }
}

/// Events plus one detection table per role.
#[derive(Debug, Default)]
pub struct Recorder {
    next_seq: AtomicU64,
    events: DashMap<u64, Event>,
    initiator_rows: DashMap<u64, DetectionRow>,
    responder_rows: DashMap<u64, DetectionRow>,
    monitor: TableMonitor,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Appends an event for the actor described by `tag` and returns it.
    /// The event is visible to readers before this returns.
    pub fn append(
        &self,
        kind: EventKind,
        tag: &ActorTag,
        session: SessionId,
        share: Element,
        key: Option<Key>,
    ) -> Event {
        let event = Event {
            seq: self.next(),
            kind,
            role: tag.role,
            actor: tag.id,
            initiator: tag.initiator().clone(),
            responder: tag.responder().clone(),
            session,
            share,
            key,
        };
        self.events.insert(event.seq, event.clone());
        event
    }

    /// Inserts a row into the table of `tag.role` and joins it against
    /// everything already inserted.
    pub fn insert_row(&self, tag: &ActorTag, session: SessionId, key: Key) -> DetectionRow {
        let row = DetectionRow {
            seq: self.next(),
            role: tag.role,
            actor: tag.id,
            initiator: tag.initiator().clone(),
            responder: tag.responder().clone(),
            session,
            key,
        };
        self.table(tag.role).insert(row.seq, row.clone());
        self.monitor.observe(&row);
        row
    }

    fn table(&self, role: Role) -> &DashMap<u64, DetectionRow> {
        match role {
            Role::Initiator => &self.initiator_rows,
            Role::Responder => &self.responder_rows,
        }
    }

    /// A snapshot of every event, oldest first.
    pub fn events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.events.iter().map(|e| e.value().clone()).collect();
        events.sort_by_key(|event| event.seq);
        events
    }

    /// A snapshot of one role's detection table, oldest first.
    pub fn rows(&self, role: Role) -> Vec<DetectionRow> {
        let mut rows: Vec<DetectionRow> = self.table(role).iter().map(|e| e.value().clone()).collect();
        rows.sort_by_key(|row| row.seq);
        rows
    }

    /// Both tables merged, oldest first.
    pub fn all_rows(&self) -> Vec<DetectionRow> {
        let mut rows = self.rows(Role::Initiator);
        rows.extend(self.rows(Role::Responder));
        rows.sort_by_key(|row| row.seq);
        rows
    }

    pub fn monitor(&self) -> &TableMonitor {
        &self.monitor
    }
}
