//! End-to-end rental flows over a sled-backed store
use anyhow::Context;
use chrono::TimeDelta;
use shareit::clock::{FixedClock, TimeStamp};
use shareit::dto::{BookItemRequestDto, BookingDto, ItemDto, NewItemRequestDto, UserDto};
use shareit::model::BookingStatus;
use shareit::storage::Storage;
use shareit::{ErrorKind, Gateway};
use std::sync::Arc;
use std::thread;

use tempfile::tempdir; // Use for test db cleanup.

fn now() -> TimeStamp {
    TimeStamp::new_with(2025, 6, 1, 12, 0, 0)
}

fn open_gateway(path: &std::path::Path, clock: Arc<FixedClock>) -> anyhow::Result<Gateway> {
    let db = Arc::new(sled::open(path)?);
    Ok(Gateway::new(Storage::sled(db)?, clock))
}

fn user(gateway: &Gateway, name: &str) -> anyhow::Result<UserDto> {
    gateway
        .create_user(&UserDto {
            id: 0,
            name: name.into(),
            email: format!("{}@shareit.dev", name.to_lowercase()),
        })
        .with_context(|| format!("creating {name}"))
}

fn drill(gateway: &Gateway, owner_id: u64) -> anyhow::Result<ItemDto> {
    gateway
        .create_item(
            &ItemDto {
                name: "Drill".into(),
                description: "Cordless drill".into(),
                available: Some(true),
                ..Default::default()
            },
            owner_id,
        )
        .context("listing drill")
}

fn book(
    gateway: &Gateway,
    item_id: u64,
    booker_id: u64,
    from_h: i64,
    to_h: i64,
) -> anyhow::Result<BookingDto> {
    gateway
        .create_booking(
            &BookItemRequestDto {
                item_id,
                start: Some(now().shifted(TimeDelta::hours(from_h))),
                end: Some(now().shifted(TimeDelta::hours(to_h))),
            },
            booker_id,
        )
        .context("booking drill")
}

/// Book, approve, fail a second decision, then comment once the rental is over
#[test]
fn rent_approve_and_review() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let clock = Arc::new(FixedClock::new(now()));
    let gateway = open_gateway(&temp_dir.path().join("rent_approve_and_review.db"), clock.clone())?;

    let owner = user(&gateway, "Owner")?;
    let booker = user(&gateway, "Booker")?;
    let item = drill(&gateway, owner.id)?;

    let booking = book(&gateway, item.id, booker.id, 1, 24)?;
    assert_eq!(booking.status, BookingStatus::Waiting);

    let approved = gateway
        .set_status(booking.id, owner.id, true)
        .context("Booking failed on approval: ")?;
    assert_eq!(approved.status, BookingStatus::Approved);

    for decision in [true, false] {
        let err = gateway.set_status(booking.id, owner.id, decision).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_code(), 400);
    }

    let current = gateway.get_all_booking_by_user(booker.id, "CURRENT", 0, 10)?;
    assert!(current.is_empty());

    clock.advance(TimeDelta::hours(2));
    let current = gateway.get_all_booking_by_owner(owner.id, "CURRENT", 0, 10)?;
    assert_eq!(current.len(), 1);

    assert_eq!(
        gateway
            .create_comment(booker.id, item.id, "Solid drill")
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );

    clock.advance(TimeDelta::days(1));
    let comment = gateway.create_comment(booker.id, item.id, "Solid drill")?;
    assert_eq!(comment.author_name, "Booker");

    let view = gateway.get_item(item.id, owner.id)?;
    assert_eq!(view.last_booking.map(|b| b.id), Some(booking.id));
    assert!(view.next_booking.is_none());
    assert_eq!(view.comments.len(), 1);

    let past = gateway.get_all_booking_by_user(booker.id, "past", 0, 10)?;
    assert_eq!(past.len(), 1);
    assert_eq!(past[0].status, BookingStatus::Approved);

    Ok(())
}

/// A window centuries ahead is stored and read back like any other
#[test]
fn far_future_booking_round_trips_through_sled() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let clock = Arc::new(FixedClock::new(now()));
    let gateway = open_gateway(&temp_dir.path().join("far_future.db"), clock)?;

    let owner = user(&gateway, "Owner")?;
    let booker = user(&gateway, "Booker")?;
    let item = drill(&gateway, owner.id)?;

    let start = TimeStamp::new_with(2300, 1, 1, 0, 0, 0);
    let booking = gateway
        .create_booking(
            &BookItemRequestDto {
                item_id: item.id,
                start: Some(start),
                end: Some(start.shifted(TimeDelta::hours(1))),
            },
            booker.id,
        )
        .context("booking in 2300")?;
    assert_eq!(booking.status, BookingStatus::Waiting);

    let stored = gateway.get_booking(booking.id, owner.id)?;
    assert_eq!(stored.start, start);
    assert_eq!(stored.end, start.shifted(TimeDelta::hours(1)));

    let approved = gateway.set_status(booking.id, owner.id, true)?;
    assert_eq!(approved.status, BookingStatus::Approved);
    let future = gateway.get_all_booking_by_user(booker.id, "FUTURE", 0, 10)?;
    assert_eq!(future.len(), 1);

    Ok(())
}

/// Two approved bookings may cover the same hours; no overlap check is made
#[test]
fn overlapping_bookings_are_both_approvable() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let clock = Arc::new(FixedClock::new(now()));
    let gateway = open_gateway(&temp_dir.path().join("overlap.db"), clock)?;

    let owner = user(&gateway, "Owner")?;
    let first = user(&gateway, "First")?;
    let second = user(&gateway, "Second")?;
    let item = drill(&gateway, owner.id)?;

    let a = book(&gateway, item.id, first.id, 10, 20)?;
    let b = book(&gateway, item.id, second.id, 15, 25)?;
    gateway.set_status(a.id, owner.id, true)?;
    gateway.set_status(b.id, owner.id, true)?;

    let future = gateway.get_all_booking_by_owner(owner.id, "FUTURE", 0, 10)?;
    let ids: Vec<u64> = future.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);
    assert!(future.iter().all(|b| b.status == BookingStatus::Approved));

    let next = gateway.get_item(item.id, owner.id)?.next_booking;
    assert_eq!(next.map(|n| n.id), Some(a.id));

    Ok(())
}

/// Racing approvals of one booking: exactly one wins, the rest see it approved
#[test]
fn concurrent_approvals_have_one_winner() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let clock = Arc::new(FixedClock::new(now()));
    let gateway = Arc::new(open_gateway(&temp_dir.path().join("race.db"), clock)?);

    let owner = user(&gateway, "Owner")?;
    let booker = user(&gateway, "Booker")?;
    let item = drill(&gateway, owner.id)?;
    let booking = book(&gateway, item.id, booker.id, 1, 2)?;
    let (booking_id, owner_id) = (booking.id, owner.id);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gateway = gateway.clone();
            thread::spawn(move || gateway.set_status(booking_id, owner_id, true))
        })
        .collect();

    let mut wins = 0;
    for handle in handles {
        match handle.join().map_err(|_| anyhow::anyhow!("approval thread panicked"))? {
            Ok(dto) => {
                assert_eq!(dto.status, BookingStatus::Approved);
                wins += 1;
            }
            Err(err) => assert_eq!(err.kind(), ErrorKind::Validation),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(
        gateway.get_booking(booking.id, booker.id)?.status,
        BookingStatus::Approved
    );

    Ok(())
}

/// An item made for a request shows up under that request
#[test]
fn request_is_answered_with_an_item() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let clock = Arc::new(FixedClock::new(now()));
    let gateway = open_gateway(&temp_dir.path().join("requests.db"), clock)?;

    let asker = user(&gateway, "Asker")?;
    let lender = user(&gateway, "Lender")?;
    let request = gateway.create_request(
        asker.id,
        &NewItemRequestDto {
            description: "Anyone have a tile cutter?".into(),
        },
    )?;

    gateway.create_item(
        &ItemDto {
            name: "Tile cutter".into(),
            description: "Manual, 60cm".into(),
            available: Some(true),
            request_id: Some(request.id),
            ..Default::default()
        },
        lender.id,
    )?;

    let seen_by_lender = gateway.get_requests_by_param(lender.id, 0, 20)?;
    assert_eq!(seen_by_lender.len(), 1);
    assert_eq!(seen_by_lender[0].items[0].name, "Tile cutter");

    let err = gateway.get_request(asker.id, request.id + 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status_code(), 404);

    Ok(())
}
