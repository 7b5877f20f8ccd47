//! Security properties evaluated over the recorder's contents.
//!
//! The two correspondence properties are computed on demand from an event
//! snapshot. The three table properties are maintained incrementally by a
//! [`TableMonitor`] that joins each new detection row against the rows
//! already inserted, so no query ever scans the whole table set.
//!
//! Checking never mutates anything: evaluating twice over the same
//! snapshot gives the same verdicts.

use crate::{
    logging,
    material::{Key, SessionId},
    recorder::{DetectionRow, Event, EventKind, Recorder},
    Host, Role,
};
use dashmap::DashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    Agreement,
    InjectiveAgreement,
    UnknownKeyShare,
    SessionSwap,
    KeyEquality,
}

impl Property {
    pub const ALL: [Property; 5] = [
        Property::Agreement,
        Property::InjectiveAgreement,
        Property::UnknownKeyShare,
        Property::SessionSwap,
        Property::KeyEquality,
    ];
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Property::Agreement => "agreement",
            Property::InjectiveAgreement => "injective agreement",
            Property::UnknownKeyShare => "unknown key-share",
            Property::SessionSwap => "session swap",
            Property::KeyEquality => "key equality",
        };
        f.write_str(name)
    }
}

/// A concrete counter-example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Witness {
    /// No earlier start from the peer role carries the end's parameters.
    Unjustified { end: Event },
    /// Every matching start was already used to justify an earlier end.
    /// `start` is the one consumed by `first_end`.
    Reused {
        start: Event,
        first_end: Event,
        second_end: Event,
    },
    /// Two rows hold the same key but disagree on identities or session.
    SharedKey {
        earlier: DetectionRow,
        later: DetectionRow,
    },
    /// The two roles of one run hold different keys.
    Diverged {
        initiator: DetectionRow,
        responder: DetectionRow,
    },
}

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Witness::Unjustified { end } => write!(f, "{end} has no matching start"),
            Witness::Reused {
                start,
                first_end,
                second_end,
            } => write!(f, "{start} justifies both {first_end} and {second_end}"),
            Witness::SharedKey { earlier, later } => write!(f, "{earlier} vs {later}"),
            Witness::Diverged {
                initiator,
                responder,
            } => write!(f, "{initiator} vs {responder}"),
        }
    }
}

/// A property together with the witness that breaks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub property: Property,
    pub witness: Witness,
}

/// The result of checking one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub property: Property,
    /// Empty when the property holds.
    pub witnesses: Vec<Witness>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.witnesses.is_empty()
    }

    /// The first counter-example, if any.
    pub fn witness(&self) -> Option<&Witness> {
        self.witnesses.first()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.witness() {
            None => write!(f, "{:<20} pass", self.property),
            Some(witness) => write!(
                f,
                "{:<20} FAIL ({} witnesses) {witness}",
                self.property,
                self.witnesses.len()
            ),
        }
    }
}

/// Every end event must follow a start by the peer role that names the same
/// two hosts and sent the share the ending actor accepted.
pub fn agreement(events: &[Event]) -> Verdict {
    let witnesses = ends(events)
        .filter(|end| starts_for(events, end).next().is_none())
        .map(|end| Witness::Unjustified { end: end.clone() })
        .collect();
    Verdict {
        property: Property::Agreement,
        witnesses,
    }
}

/// Like [`agreement`], but no start may justify two ends.
///
/// Ends are taken oldest first and each claims the oldest unclaimed start
/// that justifies it. Since any start that precedes an end also precedes
/// every later end, this greedy choice finds a one-to-one matching whenever
/// one exists.
pub fn injective_agreement(events: &[Event]) -> Verdict {
    let mut claimed: Vec<(u64, Event)> = Vec::new();
    let mut witnesses = Vec::new();
    for end in ends(events) {
        let mut candidates = starts_for(events, end).peekable();
        if candidates.peek().is_none() {
            witnesses.push(Witness::Unjustified { end: end.clone() });
            continue;
        }
        let mut first_claimed = None;
        let mut free = None;
        for start in candidates {
            match claimed.iter().find(|(seq, _)| *seq == start.seq) {
                Some((_, first_end)) => {
                    first_claimed.get_or_insert_with(|| (start, first_end.clone()));
                }
                None => {
                    free = Some(start);
                    break;
                }
            }
        }
        match (free, first_claimed) {
            (Some(start), _) => claimed.push((start.seq, end.clone())),
            (None, Some((start, first_end))) => witnesses.push(Witness::Reused {
                start: start.clone(),
                first_end,
                second_end: end.clone(),
            }),
            (None, None) => {}
        }
    }
    Verdict {
        property: Property::InjectiveAgreement,
        witnesses,
    }
}

fn ends(events: &[Event]) -> impl Iterator<Item = &Event> {
    events.iter().filter(|event| event.kind == EventKind::End)
}

/// Starts by the peer role that name the end's hosts and the share it
/// accepted, oldest first.
fn starts_for<'a>(events: &'a [Event], end: &'a Event) -> impl Iterator<Item = &'a Event> + 'a {
    events.iter().filter(move |start| {
        start.kind == EventKind::Start
            && start.role == end.role.peer()
            && start.seq < end.seq
            && start.parameters() == end.parameters()
    })
}

/// Joins detection rows as they are inserted.
///
/// Rows are grouped by key (for unknown key-share and session swap) and by
/// run (for key equality). A new row is compared only with the rows in its
/// own groups, under the group's map entry, so two rows racing into the
/// same group still see each other.
#[derive(Debug, Default)]
pub struct TableMonitor {
    by_key: DashMap<Key, Vec<DetectionRow>>,
    by_run: DashMap<(Host, Host, SessionId), Vec<DetectionRow>>,
    /// Keyed by property and the sequence numbers of the offending pair.
    violations: DashMap<(Property, u64, u64), Violation>,
}

impl TableMonitor {
    pub(crate) fn observe(&self, row: &DetectionRow) {
        {
            let mut same_key = self.by_key.entry(row.key.clone()).or_default();
            for other in same_key.iter() {
                if (&other.initiator, &other.responder) != (&row.initiator, &row.responder) {
                    self.report(Property::UnknownKeyShare, other, row);
                }
                if other.session != row.session {
                    self.report(Property::SessionSwap, other, row);
                }
            }
            same_key.push(row.clone());
        }

        let run = (row.initiator.clone(), row.responder.clone(), row.session.clone());
        let mut same_run = self.by_run.entry(run).or_default();
        for other in same_run.iter() {
            if other.role != row.role && other.key != row.key {
                self.report(Property::KeyEquality, other, row);
            }
        }
        same_run.push(row.clone());
    }

    fn report(&self, property: Property, earlier: &DetectionRow, later: &DetectionRow) {
        let witness = match property {
            Property::KeyEquality => {
                let (initiator, responder) = match earlier.role {
                    Role::Initiator => (earlier.clone(), later.clone()),
                    Role::Responder => (later.clone(), earlier.clone()),
                };
                Witness::Diverged {
                    initiator,
                    responder,
                }
            }
            _ => Witness::SharedKey {
                earlier: earlier.clone(),
                later: later.clone(),
            },
        };
        let violation = Violation { property, witness };
        logging::violation(&violation);
        self.violations
            .insert((property, earlier.seq, later.seq), violation);
    }

    /// The verdict for one of the table properties, witnesses oldest first.
    pub fn verdict(&self, property: Property) -> Verdict {
        let mut found: Vec<((Property, u64, u64), Witness)> = self
            .violations
            .iter()
            .filter(|entry| entry.key().0 == property)
            .map(|entry| (*entry.key(), entry.value().witness.clone()))
            .collect();
        found.sort_by_key(|(key, _)| *key);
        Verdict {
            property,
            witnesses: found.into_iter().map(|(_, witness)| witness).collect(),
        }
    }
}

/// Evaluates one property against the recorder's current contents.
pub fn check(property: Property, recorder: &Recorder) -> Verdict {
    match property {
        Property::Agreement => agreement(&recorder.events()),
        Property::InjectiveAgreement => injective_agreement(&recorder.events()),
        table => recorder.monitor().verdict(table),
    }
}

/// Evaluates every property, in [`Property::ALL`] order.
pub fn check_all(recorder: &Recorder) -> Vec<Verdict> {
    Property::ALL
        .into_iter()
        .map(|property| check(property, recorder))
        .collect()
}
