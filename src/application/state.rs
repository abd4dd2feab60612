//! # Vote State
//!
//! Defines the persistent vote record (`VoteRecord`), its phase (`Phase`) and the ballot tallies.
//! Fields that only make sense in some phases live in that phase's payload, so the wizard's
//! collected answers and the ballot cannot outlive the phase that owns them.
//! It handles serialization and deserialization to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::types::UserRef;

/// A cast vote. Replaced wholesale when the user votes again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VotePerson {
    pub user: UserRef,
    #[serde(default)]
    pub reason: Option<String>,
}

impl VotePerson {
    pub fn new(user: UserRef) -> Self {
        Self { user, reason: None }
    }

    pub fn with_reason(user: UserRef, reason: impl Into<String>) -> Self {
        Self {
            user,
            reason: Some(reason.into()),
        }
    }
}

/// The person being voted on, as collected by the wizard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nominee {
    pub user_name: String,
    pub name: String,
    pub description: String,
}

/// Vote counts as displayed on the ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub yes: usize,
    pub no: usize,
    pub pending: usize,
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} + {}", self.yes, self.no, self.pending)
    }
}

/// Stores a voter map as a plain list; the key is rebuilt from `user.id` on load.
///
/// `Phase` is internally tagged, and serde buffers such enums with string map
/// keys, so integer-keyed maps cannot be read back from inside it.
mod voter_list {
    use super::*;

    pub fn serialize<S: Serializer>(
        voters: &BTreeMap<u64, VotePerson>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(voters.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<u64, VotePerson>, D::Error> {
        let voters = Vec::<VotePerson>::deserialize(deserializer)?;
        Ok(voters
            .into_iter()
            .map(|person| (person.user.id, person))
            .collect())
    }
}

/// Voters of a running vote, keyed by user id.
///
/// Every mutation removes the voter from the other two sets first, so a user id
/// is never in more than one of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ballot {
    #[serde(default, with = "voter_list")]
    pub voted_yes: BTreeMap<u64, VotePerson>,
    #[serde(default, with = "voter_list")]
    pub voted_no: BTreeMap<u64, VotePerson>,
    #[serde(default, with = "voter_list")]
    pub voted_no_pending: BTreeMap<u64, VotePerson>,
}

impl Ballot {
    pub fn vote_yes(&mut self, user: UserRef) {
        self.forget(user.id);
        self.voted_yes.insert(user.id, VotePerson::new(user));
    }

    /// Records a "no" whose reason is still to come.
    pub fn vote_no(&mut self, user: UserRef) {
        self.forget(user.id);
        self.voted_no_pending.insert(user.id, VotePerson::new(user));
    }

    /// Moves a pending "no" into the justified set. Returns false if the user had no pending vote.
    pub fn supply_reason(&mut self, user: UserRef, reason: &str) -> bool {
        if self.voted_no_pending.remove(&user.id).is_none() {
            return false;
        }
        self.forget(user.id);
        self.voted_no
            .insert(user.id, VotePerson::with_reason(user, reason));
        true
    }

    pub fn is_pending(&self, user_id: u64) -> bool {
        self.voted_no_pending.contains_key(&user_id)
    }

    pub fn tally(&self) -> Tally {
        Tally {
            yes: self.voted_yes.len(),
            no: self.voted_no.len(),
            pending: self.voted_no_pending.len(),
        }
    }

    fn forget(&mut self, user_id: u64) {
        self.voted_yes.remove(&user_id);
        self.voted_no.remove(&user_id);
        self.voted_no_pending.remove(&user_id);
    }
}

/// Where the vote workflow currently is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state")]
pub enum Phase {
    #[default]
    None,
    WaitUsername {
        creator: UserRef,
    },
    WaitName {
        creator: UserRef,
        user_name: String,
    },
    WaitDescription {
        creator: UserRef,
        user_name: String,
        name: String,
    },
    Review {
        creator: UserRef,
        nominee: Nominee,
    },
    Run {
        creator: UserRef,
        nominee: Nominee,
        vote_message_id: i32,
        #[serde(default)]
        ballot: Ballot,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::None => "None",
            Phase::WaitUsername { .. } => "WaitUsername",
            Phase::WaitName { .. } => "WaitName",
            Phase::WaitDescription { .. } => "WaitDescription",
            Phase::Review { .. } => "Review",
            Phase::Run { .. } => "Run",
        }
    }

    /// The user running the wizard. Only set while the wizard is active.
    pub fn wizard_creator(&self) -> Option<&UserRef> {
        match self {
            Phase::WaitUsername { creator }
            | Phase::WaitName { creator, .. }
            | Phase::WaitDescription { creator, .. }
            | Phase::Review { creator, .. } => Some(creator),
            Phase::None | Phase::Run { .. } => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Phase::Run { .. })
    }
}

/// The single persisted vote aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteRecord {
    /// Target group. Fixed at construction.
    pub chat_id: i64,
    /// Absolute deadline; `None` when no deadline is active.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub phase: Phase,
}

impl VoteRecord {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            end_time: None,
            phase: Phase::None,
        }
    }

    /// Whether the deadline has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| now > end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> UserRef {
        UserRef::new(id, Some(&format!("user{id}")), "User")
    }

    fn assert_disjoint(ballot: &Ballot) {
        for id in ballot.voted_yes.keys() {
            assert!(!ballot.voted_no.contains_key(id));
            assert!(!ballot.voted_no_pending.contains_key(id));
        }
        for id in ballot.voted_no.keys() {
            assert!(!ballot.voted_no_pending.contains_key(id));
        }
    }

    #[test]
    fn test_voter_is_in_at_most_one_set() {
        let mut ballot = Ballot::default();
        // Deterministic interleaving of every action over three voters.
        for step in 0..60u64 {
            let voter = user(step % 3);
            match (step / 3 + step / 7) % 3 {
                0 => ballot.vote_yes(voter),
                1 => ballot.vote_no(voter),
                _ => {
                    ballot.supply_reason(voter, "because");
                }
            }
            assert_disjoint(&ballot);
            let tally = ballot.tally();
            assert!(tally.yes + tally.no + tally.pending <= 3);
        }
    }

    #[test]
    fn test_reason_moves_pending_to_no() {
        let mut ballot = Ballot::default();
        ballot.vote_yes(user(1));
        ballot.vote_no(user(2));
        let before = ballot.tally();

        assert!(ballot.supply_reason(user(2), "disagree"));

        let after = ballot.tally();
        assert_eq!(after.no, before.no + 1);
        assert_eq!(after.pending, before.pending - 1);
        assert_eq!(
            ballot.voted_no.get(&2).and_then(|p| p.reason.as_deref()),
            Some("disagree")
        );
    }

    #[test]
    fn test_reason_without_pending_vote_is_ignored() {
        let mut ballot = Ballot::default();
        ballot.vote_yes(user(1));
        assert!(!ballot.supply_reason(user(1), "changed my mind"));
        assert_eq!(ballot.tally(), Tally { yes: 1, no: 0, pending: 0 });
    }

    #[test]
    fn test_revote_replaces_previous_vote() {
        let mut ballot = Ballot::default();
        ballot.vote_no(user(1));
        ballot.supply_reason(user(1), "no");
        ballot.vote_yes(user(1));
        assert_eq!(ballot.tally(), Tally { yes: 1, no: 0, pending: 0 });
        ballot.vote_no(user(1));
        assert_eq!(ballot.tally(), Tally { yes: 0, no: 0, pending: 1 });
    }

    #[test]
    fn test_tally_display() {
        let tally = Tally { yes: 1, no: 0, pending: 1 };
        assert_eq!(tally.to_string(), "1 / 0 + 1");
    }

    #[test]
    fn test_wizard_creator_only_during_wizard() {
        let creator = user(1);
        assert!(Phase::None.wizard_creator().is_none());
        assert_eq!(
            Phase::WaitUsername { creator: creator.clone() }.wizard_creator(),
            Some(&creator)
        );
        let run = Phase::Run {
            creator: creator.clone(),
            nominee: Nominee {
                user_name: "a".into(),
                name: "b".into(),
                description: "c".into(),
            },
            vote_message_id: 7,
            ballot: Ballot::default(),
        };
        assert!(run.wizard_creator().is_none());
        assert!(run.is_running());
    }

    #[test]
    fn test_record_json_layout() {
        let mut record = VoteRecord::new(-100);
        record.phase = Phase::WaitName {
            creator: user(1),
            user_name: "alice".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["chat_id"], -100);
        assert_eq!(json["phase"]["state"], "WaitName");
        assert_eq!(json["phase"]["user_name"], "alice");

        let back: VoteRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_running_record_with_voters_reads_back() {
        let mut ballot = Ballot::default();
        ballot.vote_yes(user(2));
        ballot.vote_no(user(3));
        ballot.supply_reason(user(3), "disagree");
        ballot.vote_no(user(4));
        let mut record = VoteRecord::new(-100);
        record.end_time = Some(Utc::now());
        record.phase = Phase::Run {
            creator: user(1),
            nominee: Nominee {
                user_name: "@dave".into(),
                name: "Dave".into(),
                description: "did good things".into(),
            },
            vote_message_id: 42,
            ballot,
        };

        let json = serde_json::to_string_pretty(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["phase"]["ballot"]["voted_yes"][0]["user"]["id"], 2);
        assert_eq!(value["phase"]["ballot"]["voted_no"][0]["reason"], "disagree");

        let back: VoteRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        let Phase::Run { ballot, .. } = &back.phase else {
            panic!("expected a running vote, got {}", back.phase.name());
        };
        assert!(ballot.is_pending(4));
        assert_eq!(ballot.tally(), Tally { yes: 1, no: 1, pending: 1 });
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut record = VoteRecord::new(1);
        assert!(!record.is_expired(now));
        record.end_time = Some(now - chrono::Duration::seconds(1));
        assert!(record.is_expired(now));
        record.end_time = Some(now + chrono::Duration::seconds(1));
        assert!(!record.is_expired(now));
    }
}
