//! Wire types and the entity-to-DTO mapping
//!
//! Field names follow the camelCase JSON the HTTP tier speaks. Patch types use
//! `Option` for every field: an omitted field and an explicit `null` both
//! decode to `None`, which means "keep the current value".
use super::clock::TimeStamp;
use super::model::{Booking, BookingStatus, Comment, Item, ItemRequest, User};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDto {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemDto {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub available: Option<bool>,
    pub owner: Option<UserDto>,
    pub request_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

/// Booking as it appears inside an item view
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingShortDto {
    pub id: u64,
    pub booker_id: u64,
    pub start: TimeStamp,
    pub end: TimeStamp,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: u64,
    pub text: String,
    pub author_name: String,
    pub created: TimeStamp,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemDtoFull {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<u64>,
    pub last_booking: Option<BookingShortDto>,
    pub next_booking: Option<BookingShortDto>,
    pub comments: Vec<CommentDto>,
}

/// Body of a booking request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookItemRequestDto {
    pub item_id: u64,
    pub start: Option<TimeStamp>,
    pub end: Option<TimeStamp>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingDto {
    pub id: u64,
    pub start: TimeStamp,
    pub end: TimeStamp,
    pub item_id: u64,
    pub item: ItemDto,
    pub booker_id: u64,
    pub booker: UserDto,
    pub status: BookingStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NewItemRequestDto {
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequestDto {
    pub id: u64,
    pub description: String,
    pub created: TimeStamp,
    pub items: Vec<ItemDto>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

impl From<&Item> for ItemDto {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            available: Some(item.available),
            owner: None,
            request_id: item.request_id,
        }
    }
}

impl ItemDto {
    pub fn with_owner(mut self, owner: &User) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

impl From<&Booking> for BookingShortDto {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            booker_id: booking.booker_id,
            start: booking.start,
            end: booking.end,
        }
    }
}

impl CommentDto {
    pub fn new(comment: &Comment, author: &User) -> Self {
        Self {
            id: comment.id,
            text: comment.text.clone(),
            author_name: author.name.clone(),
            created: comment.created,
        }
    }
}

impl ItemDtoFull {
    pub fn new(
        item: &Item,
        last: Option<&Booking>,
        next: Option<&Booking>,
        comments: Vec<CommentDto>,
    ) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            available: item.available,
            request_id: item.request_id,
            last_booking: last.map(BookingShortDto::from),
            next_booking: next.map(BookingShortDto::from),
            comments,
        }
    }
}

impl BookingDto {
    pub fn new(booking: &Booking, item: &Item, booker: &User) -> Self {
        Self {
            id: booking.id,
            start: booking.start,
            end: booking.end,
            item_id: booking.item_id,
            item: item.into(),
            booker_id: booking.booker_id,
            booker: booker.into(),
            status: booking.status,
        }
    }
}

impl ItemRequestDto {
    pub fn new(request: &ItemRequest, items: &[Item]) -> Self {
        Self {
            id: request.id,
            description: request.description.clone(),
            created: request.created,
            items: items.iter().map(ItemDto::from).collect(),
        }
    }
}
