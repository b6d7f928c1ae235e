//! Stateless precondition checks
//!
//! Nothing here touches storage. Each check either passes or returns the
//! categorised error naming the violated rule.
use super::clock::TimeStamp;
use super::error::{ShareItError, ShareItResult};
use super::model::{BookingDraft, Item, User};
use regex::Regex;
use std::sync::LazyLock;

// ASCII word characters only
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?-u:\w)+([.-]?(?-u:\w)+)*@(?-u:\w)+([.-]?(?-u:\w)+)*\.(?-u:\w){2,4}$")
        .expect("email pattern is valid")
});

pub fn check_owner(item: &Item, user: &User) -> ShareItResult<()> {
    if item.owner_id != user.id {
        return Err(ShareItError::not_found(format!(
            "User {} is not the owner of '{}'",
            user.id, item.name
        )));
    }
    Ok(())
}

/// Availability, then self-booking, then the booking window. First failure wins.
pub fn check_booking(draft: &BookingDraft, now: TimeStamp) -> ShareItResult<()> {
    if !draft.item.available {
        return Err(ShareItError::validation(format!(
            "Item '{}' is not available for booking",
            draft.item.name
        )));
    }
    check_owner_and_booker(draft)?;
    check_time_of_booking(draft, now)
}

fn check_owner_and_booker(draft: &BookingDraft) -> ShareItResult<()> {
    if draft.item.owner_id == draft.booker.id {
        return Err(ShareItError::not_found("Owner cannot book their own item"));
    }
    Ok(())
}

fn check_time_of_booking(draft: &BookingDraft, now: TimeStamp) -> ShareItResult<()> {
    let (Some(start), Some(end)) = (draft.start, draft.end) else {
        return Err(ShareItError::validation(
            "Booking start and/or end time is missing",
        ));
    };

    if end <= start || start < now {
        return Err(ShareItError::validation(
            "Booking must start now or later and end strictly after its start",
        ));
    }
    Ok(())
}

/// Format check on a present email, then a linear scan of `users` for another
/// account (different id) already holding it.
pub fn check_email_on_exist_and_valid(
    candidate_id: u64,
    email: Option<&str>,
    users: &[User],
) -> ShareItResult<()> {
    if let Some(email) = email {
        check_email_on_valid(email)?;
    }

    let taken = users
        .iter()
        .find(|u| Some(u.email.as_str()) == email)
        .is_some_and(|u| u.id != candidate_id);

    if taken {
        return Err(ShareItError::already_exists(format!(
            "Email '{}' is already taken",
            email.unwrap_or_default()
        )));
    }
    Ok(())
}

fn check_email_on_valid(email: &str) -> ShareItResult<()> {
    if email.trim().is_empty() || !EMAIL.is_match(email) {
        return Err(ShareItError::validation(format!(
            "Invalid email address '{email}'"
        )));
    }
    Ok(())
}
