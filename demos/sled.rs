//! Walks one rental through a sled-backed store: list an item, book it,
//! approve it, then read the owner's view back.
//!
//! Storage and log level come from `SHAREIT_*` variables (or a `.env` file).
use anyhow::Context;
use chrono::TimeDelta;
use shareit::clock::TimeStamp;
use shareit::config::Config;
use shareit::dto::{BookItemRequestDto, ItemDto, UserDto};
use shareit::storage::Storage;
use shareit::{Gateway, telemetry};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    telemetry::init(&config.log_filter)?;

    let storage = Storage::from_config(&config)?;
    let gateway = Gateway::with_system_clock(storage.clone());

    let stamp = TimeStamp::new().to_datetime_utc().timestamp();
    let owner = gateway
        .create_user(&UserDto {
            id: 0,
            name: "Owner".into(),
            email: format!("owner{stamp}@shareit.dev"),
        })
        .context("creating owner")?;
    let booker = gateway
        .create_user(&UserDto {
            id: 0,
            name: "Booker".into(),
            email: format!("booker{stamp}@shareit.dev"),
        })
        .context("creating booker")?;

    let item = gateway
        .create_item(
            &ItemDto {
                name: "Cordless drill".into(),
                description: "18V with two batteries".into(),
                available: Some(true),
                ..Default::default()
            },
            owner.id,
        )
        .context("listing item")?;

    let start = TimeStamp::new().shifted(TimeDelta::days(1));
    let booking = gateway
        .create_booking(
            &BookItemRequestDto {
                item_id: item.id,
                start: Some(start),
                end: Some(start.shifted(TimeDelta::days(2))),
            },
            booker.id,
        )
        .context("booking item")?;

    let approved = gateway
        .set_status(booking.id, owner.id, true)
        .context("approving booking")?;
    tracing::info!(booking_id = approved.id, status = ?approved.status, "approved");

    let view = gateway.get_item(item.id, owner.id)?;
    println!("{}", view.name);
    if let Some(next) = view.next_booking {
        println!("  next booking #{} by user {} from {}", next.id, next.booker_id, next.start.to_datetime_utc());
    }

    storage.flush()?;
    Ok(())
}
