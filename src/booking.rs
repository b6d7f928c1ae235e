//! Booking service: persistence, bucket classification and last/next lookups
use super::clock::{Clock, TimeStamp};
use super::error::{ShareItError, ShareItResult};
use super::model::{Booking, BookingStatus, Item};
use super::page::PageRequest;
use super::storage::RecordStore;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Named filter over a user's bookings, relative to the current instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingState {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl BookingState {
    pub const VALUES: [BookingState; 6] = [
        BookingState::All,
        BookingState::Current,
        BookingState::Past,
        BookingState::Future,
        BookingState::Waiting,
        BookingState::Rejected,
    ];

    pub fn matches(&self, booking: &Booking, now: TimeStamp) -> bool {
        match self {
            BookingState::All => true,
            BookingState::Current => booking.start < now && booking.end > now,
            BookingState::Past => booking.end < now,
            BookingState::Future => booking.start > now,
            BookingState::Waiting => {
                booking.start > now && booking.status == BookingStatus::Waiting
            }
            BookingState::Rejected => booking.status == BookingStatus::Rejected,
        }
    }
}

impl FromStr for BookingState {
    type Err = ShareItError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(BookingState::All),
            "CURRENT" => Ok(BookingState::Current),
            "PAST" => Ok(BookingState::Past),
            "FUTURE" => Ok(BookingState::Future),
            "WAITING" => Ok(BookingState::Waiting),
            "REJECTED" => Ok(BookingState::Rejected),
            _ => Err(ShareItError::illegal_argument(format!("Unknown state: {s}"))),
        }
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingState::All => "ALL",
            BookingState::Current => "CURRENT",
            BookingState::Past => "PAST",
            BookingState::Future => "FUTURE",
            BookingState::Waiting => "WAITING",
            BookingState::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

pub struct BookingService {
    bookings: Arc<dyn RecordStore<Booking>>,
    items: Arc<dyn RecordStore<Item>>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn RecordStore<Booking>>,
        items: Arc<dyn RecordStore<Item>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            items,
            clock,
        }
    }

    /// Persist a new booking as given; validation happens before this point.
    pub fn create_booking(&self, booking: Booking) -> ShareItResult<Booking> {
        let saved = self.bookings.save(booking)?;
        tracing::info!(
            booking_id = saved.id,
            item_id = saved.item_id,
            booker_id = saved.booker_id,
            status = ?saved.status,
            "booking saved"
        );
        Ok(saved)
    }

    pub fn get_booking(&self, id: u64) -> ShareItResult<Booking> {
        self.bookings
            .get(id)?
            .ok_or_else(|| ShareItError::not_found(format!("Booking {id} not found")))
    }

    /// Swap `current` for a copy carrying `status`, only if nobody changed the
    /// stored booking in between. `None` means the caller lost the race.
    pub fn update_status(
        &self,
        current: &Booking,
        status: BookingStatus,
    ) -> ShareItResult<Option<Booking>> {
        let updated = current.with_status(status);
        if !self.bookings.compare_and_swap(current, &updated)? {
            tracing::debug!(booking_id = current.id, "status update lost a race");
            return Ok(None);
        }
        tracing::info!(booking_id = updated.id, status = ?updated.status, "booking status changed");
        Ok(Some(updated))
    }

    pub fn get_all_booking_by_user(
        &self,
        user_id: u64,
        state: BookingState,
        page: PageRequest,
    ) -> ShareItResult<Vec<Booking>> {
        let now = self.clock.now();
        tracing::debug!(user_id, %state, page = page.index, "bookings by booker");

        let rows = self
            .bookings
            .scan()?
            .into_iter()
            .filter(|b| b.booker_id == user_id && state.matches(b, now));
        Ok(page.apply(sort_by_start_desc(rows)))
    }

    pub fn get_all_booking_by_owner(
        &self,
        owner_id: u64,
        state: BookingState,
        page: PageRequest,
    ) -> ShareItResult<Vec<Booking>> {
        let now = self.clock.now();
        tracing::debug!(owner_id, %state, page = page.index, "bookings by item owner");

        let owned: HashSet<u64> = self
            .items
            .scan()?
            .into_iter()
            .filter(|item| item.owner_id == owner_id)
            .map(|item| item.id)
            .collect();

        let rows = self
            .bookings
            .scan()?
            .into_iter()
            .filter(|b| owned.contains(&b.item_id) && state.matches(b, now));
        Ok(page.apply(sort_by_start_desc(rows)))
    }

    /// `"last"`: per item, the approved booking already started with the
    /// latest end. `"next"`: per item, the approved booking not yet started
    /// with the earliest start. Any other flag yields nothing.
    pub fn get_last_or_next(&self, item_ids: &[u64], flag: &str) -> ShareItResult<Vec<Booking>> {
        let now = self.clock.now();
        let wanted: HashSet<u64> = item_ids.iter().copied().collect();

        let approved = || -> ShareItResult<Vec<Booking>> {
            Ok(self
                .bookings
                .scan()?
                .into_iter()
                .filter(|b| wanted.contains(&b.item_id) && b.status == BookingStatus::Approved)
                .collect())
        };

        let mut chosen: HashMap<u64, Booking> = HashMap::new();
        match flag {
            "last" => {
                for booking in approved()?.into_iter().filter(|b| b.start < now) {
                    let later = chosen
                        .get(&booking.item_id)
                        .is_none_or(|best| booking.end > best.end);
                    if later {
                        chosen.insert(booking.item_id, booking);
                    }
                }
            }
            "next" => {
                for booking in approved()?.into_iter().filter(|b| b.start > now) {
                    let sooner = chosen
                        .get(&booking.item_id)
                        .is_none_or(|best| booking.start < best.start);
                    if sooner {
                        chosen.insert(booking.item_id, booking);
                    }
                }
            }
            _ => return Ok(Vec::new()),
        }

        Ok(item_ids.iter().filter_map(|id| chosen.remove(id)).collect())
    }

    pub fn has_bookings_by_booker(&self, user_id: u64) -> ShareItResult<bool> {
        Ok(self.bookings.scan()?.iter().any(|b| b.booker_id == user_id))
    }

    pub fn has_bookings_of_item(&self, item_id: u64) -> ShareItResult<bool> {
        Ok(self.bookings.scan()?.iter().any(|b| b.item_id == item_id))
    }

    /// First booking (by id) of `user_id` on `item_id` that has already ended
    pub fn get_booking_by_user_and_item(
        &self,
        user_id: u64,
        item_id: u64,
    ) -> ShareItResult<Option<Booking>> {
        let now = self.clock.now();
        Ok(self
            .bookings
            .scan()?
            .into_iter()
            .find(|b| b.item_id == item_id && b.booker_id == user_id && b.end < now))
    }
}

fn sort_by_start_desc(rows: impl Iterator<Item = Booking>) -> Vec<Booking> {
    let mut rows: Vec<Booking> = rows.collect();
    rows.sort_by_key(|b| (Reverse(b.start), Reverse(b.id)));
    rows
}
