//! Persisted entities
//!
//! Every entity is CBOR-encoded with indexed fields and keyed by its numeric
//! id. An id of `0` marks a record that has not been saved yet; the store
//! assigns the real id on first save.
use super::clock::TimeStamp;
use super::error::{ShareItError, ShareItResult};
use serde::{Deserialize, Serialize};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub email: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Item {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub available: bool,
    #[n(4)]
    pub owner_id: u64,
    #[n(5)]
    pub request_id: Option<u64>, // weak reference, never an ownership relation
}

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[n(0)]
    Waiting,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

impl BookingStatus {
    /// Outcome of the owner's decision on a booking currently in `self`.
    ///
    /// Only `Approved` is guarded. A rejected booking may be rejected again,
    /// or approved.
    pub fn decide(self, approved: bool) -> ShareItResult<Self> {
        if self == BookingStatus::Approved {
            return Err(ShareItError::validation("Booking is already approved"));
        }
        Ok(if approved {
            BookingStatus::Approved
        } else {
            BookingStatus::Rejected
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub start: TimeStamp,
    #[n(2)]
    pub end: TimeStamp,
    #[n(3)]
    pub item_id: u64,
    #[n(4)]
    pub booker_id: u64,
    #[n(5)]
    pub status: BookingStatus,
}

impl Booking {
    pub fn with_status(&self, status: BookingStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub description: String,
    #[n(2)]
    pub requester_id: u64,
    #[n(3)]
    pub created: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub text: String,
    #[n(2)]
    pub item_id: u64,
    #[n(3)]
    pub author_id: u64,
    #[n(4)]
    pub created: TimeStamp,
}

/// A booking before validation: the loaded item and booker plus whatever
/// window the caller supplied.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub start: Option<TimeStamp>,
    pub end: Option<TimeStamp>,
    pub item: Item,
    pub booker: User,
}

impl BookingDraft {
    pub fn new(item: Item, booker: User) -> Self {
        Self {
            start: None,
            end: None,
            item,
            booker,
        }
    }
    pub fn set_start(mut self, start: Option<TimeStamp>) -> Self {
        self.start = start;
        self
    }
    pub fn set_end(mut self, end: Option<TimeStamp>) -> Self {
        self.end = end;
        self
    }
    /// Turn a checked draft into an unsaved `Waiting` booking
    pub fn finalise(self) -> ShareItResult<Booking> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok(Booking {
                id: 0,
                start,
                end,
                item_id: self.item.id,
                booker_id: self.booker.id,
                status: BookingStatus::Waiting,
            }),
            _ => Err(ShareItError::validation(
                "Booking start and/or end time is missing",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> Booking {
        Booking {
            id: 7,
            start: TimeStamp::new_with(2025, 3, 1, 10, 0, 0),
            end: TimeStamp::new_with(2025, 3, 2, 10, 0, 0),
            item_id: 3,
            booker_id: 2,
            status: BookingStatus::Waiting,
        }
    }

    #[test]
    fn approved_is_the_only_guarded_status() {
        assert_eq!(
            BookingStatus::Waiting.decide(true).unwrap(),
            BookingStatus::Approved
        );
        assert_eq!(
            BookingStatus::Waiting.decide(false).unwrap(),
            BookingStatus::Rejected
        );
        assert_eq!(
            BookingStatus::Rejected.decide(false).unwrap(),
            BookingStatus::Rejected
        );
        assert_eq!(
            BookingStatus::Rejected.decide(true).unwrap(),
            BookingStatus::Approved
        );
        assert!(BookingStatus::Approved.decide(true).is_err());
        assert!(BookingStatus::Approved.decide(false).is_err());
    }

    #[test]
    fn with_status_keeps_other_fields() {
        let original = booking();
        let approved = original.with_status(BookingStatus::Approved);

        assert_eq!(approved.status, BookingStatus::Approved);
        assert_eq!(approved.id, original.id);
        assert_eq!(approved.start, original.start);
        assert_eq!(approved.end, original.end);
        assert_eq!(approved.item_id, original.item_id);
        assert_eq!(approved.booker_id, original.booker_id);
    }

    #[test]
    fn booking_cbor_roundtrip() {
        let original = booking();
        let encoded = minicbor::to_vec(&original).unwrap();
        let decoded: Booking = minicbor::decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn draft_without_window_does_not_finalise() {
        let owner = User {
            id: 1,
            name: "Owner".into(),
            email: "owner@mail.com".into(),
        };
        let item = Item {
            id: 1,
            name: "Drill".into(),
            description: "Cordless".into(),
            available: true,
            owner_id: 1,
            request_id: None,
        };
        let draft = BookingDraft::new(item, owner).set_start(Some(TimeStamp::new()));
        assert!(draft.finalise().is_err());
    }
}
