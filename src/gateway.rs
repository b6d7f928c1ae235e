//! Orchestration layer the HTTP tier calls into
//!
//! Every operation takes what a controller extracts from the request (the
//! caller's user id header, path ids, `from`/`size`, `state`) and returns a
//! DTO or a categorised [`ShareItError`]. Entities are loaded here, checked by
//! the [`validator`], and only then handed to the services.
use super::booking::{BookingService, BookingState};
use super::clock::{Clock, SystemClock};
use super::dto::{
    BookItemRequestDto, BookingDto, CommentDto, ItemDto, ItemDtoFull, ItemPatch, ItemRequestDto,
    NewItemRequestDto, UserDto, UserPatch,
};
use super::error::{ShareItError, ShareItResult};
use super::item::ItemService;
use super::model::{Booking, BookingDraft, Comment, Item, ItemRequest};
use super::page::PageRequest;
use super::request::ItemRequestService;
use super::storage::Storage;
use super::user::UserService;
use super::validator;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Gateway {
    users: UserService,
    items: ItemService,
    bookings: BookingService,
    requests: ItemRequestService,
    clock: Arc<dyn Clock>,
}

fn rejected(operation: &'static str) -> impl Fn(&ShareItError) {
    move |err| tracing::warn!(operation, error = %err, "request rejected")
}

impl Gateway {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: UserService::new(storage.users),
            items: ItemService::new(storage.items.clone(), storage.comments),
            bookings: BookingService::new(storage.bookings, storage.items, clock.clone()),
            requests: ItemRequestService::new(storage.requests),
            clock,
        }
    }

    pub fn with_system_clock(storage: Storage) -> Self {
        Self::new(storage, Arc::new(SystemClock))
    }

    // Users

    pub fn create_user(&self, dto: &UserDto) -> ShareItResult<UserDto> {
        let user = self
            .users
            .create_user(&dto.name, &dto.email)
            .inspect_err(rejected("create_user"))?;
        Ok((&user).into())
    }

    pub fn get_user(&self, user_id: u64) -> ShareItResult<UserDto> {
        Ok((&self.users.get_user(user_id)?).into())
    }

    pub fn get_all_users(&self) -> ShareItResult<Vec<UserDto>> {
        Ok(self.users.get_all_users()?.iter().map(UserDto::from).collect())
    }

    pub fn update_user(&self, user_id: u64, patch: &UserPatch) -> ShareItResult<UserDto> {
        let user = self
            .users
            .update_user(user_id, patch)
            .inspect_err(rejected("update_user"))?;
        Ok((&user).into())
    }

    /// Refused with `Conflict` while the user owns items, has bookings,
    /// comments or item requests.
    pub fn delete_user(&self, user_id: u64) -> ShareItResult<String> {
        self.users.get_user(user_id)?;

        let held = [
            (
                !self.items.get_all_by_user(user_id, PageRequest::unpaged())?.is_empty(),
                "owns items",
            ),
            (self.bookings.has_bookings_by_booker(user_id)?, "has bookings"),
            (self.items.has_comments_by_author(user_id)?, "has comments"),
            (
                !self.requests.get_requests_by_user(user_id)?.is_empty(),
                "has item requests",
            ),
        ];
        if let Some((_, reason)) = held.iter().find(|(blocked, _)| *blocked) {
            return Err(ShareItError::conflict(format!(
                "User {user_id} {reason} and cannot be deleted"
            )))
            .inspect_err(rejected("delete_user"));
        }

        self.users.delete_user(user_id)
    }

    // Items

    pub fn create_item(&self, dto: &ItemDto, owner_id: u64) -> ShareItResult<ItemDto> {
        self.create_item_inner(dto, owner_id)
            .inspect_err(rejected("create_item"))
    }

    fn create_item_inner(&self, dto: &ItemDto, owner_id: u64) -> ShareItResult<ItemDto> {
        if dto.name.trim().is_empty() {
            return Err(ShareItError::validation("Item name must not be blank"));
        }
        if dto.description.trim().is_empty() {
            return Err(ShareItError::validation("Item description must not be blank"));
        }
        let Some(available) = dto.available else {
            return Err(ShareItError::validation("Item availability is not specified"));
        };
        if let Some(request_id) = dto.request_id {
            self.requests.get_request(request_id)?;
        }
        let owner = self.users.get_user(owner_id)?;

        let item = self.items.create_item(Item {
            id: 0,
            name: dto.name.clone(),
            description: dto.description.clone(),
            available,
            owner_id: owner.id,
            request_id: dto.request_id,
        })?;
        Ok(ItemDto::from(&item).with_owner(&owner))
    }

    /// Last/next bookings are only disclosed to the item's owner
    pub fn get_item(&self, item_id: u64, user_id: u64) -> ShareItResult<ItemDtoFull> {
        let item = self.items.get_item(item_id)?;
        let comments = self.comment_dtos(item.id)?;

        if item.owner_id != user_id {
            return Ok(ItemDtoFull::new(&item, None, None, comments));
        }

        let last = self.bookings.get_last_or_next(&[item.id], "last")?;
        let next = self.bookings.get_last_or_next(&[item.id], "next")?;
        Ok(ItemDtoFull::new(&item, last.first(), next.first(), comments))
    }

    pub fn get_all_by_user(
        &self,
        user_id: u64,
        from: usize,
        size: usize,
    ) -> ShareItResult<Vec<ItemDtoFull>> {
        self.users.get_user(user_id)?;
        let mut items = self.items.get_all_by_user(user_id, PageRequest::of(from, size)?)?;
        items.sort_by_key(|item| item.id);

        let item_ids: Vec<u64> = items.iter().map(|item| item.id).collect();
        let by_item = |bookings: Vec<Booking>| -> HashMap<u64, Booking> {
            bookings.into_iter().map(|b| (b.item_id, b)).collect()
        };
        let last = by_item(self.bookings.get_last_or_next(&item_ids, "last")?);
        let next = by_item(self.bookings.get_last_or_next(&item_ids, "next")?);

        items
            .iter()
            .map(|item| {
                Ok(ItemDtoFull::new(
                    item,
                    last.get(&item.id),
                    next.get(&item.id),
                    self.comment_dtos(item.id)?,
                ))
            })
            .collect()
    }

    pub fn update_item(
        &self,
        item_id: u64,
        patch: &ItemPatch,
        owner_id: u64,
    ) -> ShareItResult<ItemDto> {
        let user = self.users.get_user(owner_id)?;
        let old = self.items.get_item(item_id)?;
        validator::check_owner(&old, &user).inspect_err(rejected("update_item"))?;

        Ok((&self.items.update_item(item_id, patch)?).into())
    }

    /// Refused with `Conflict` while the item has bookings or comments
    pub fn delete_item(&self, item_id: u64) -> ShareItResult<String> {
        self.items.get_item(item_id)?;

        if self.bookings.has_bookings_of_item(item_id)?
            || !self.items.get_comments_by_item(item_id)?.is_empty()
        {
            return Err(ShareItError::conflict(format!(
                "Item {item_id} has bookings or comments and cannot be deleted"
            )))
            .inspect_err(rejected("delete_item"));
        }

        self.items.delete_item(item_id)
    }

    /// The page is cut from all items before filtering, so a page may come
    /// back short even when later pages hold matches.
    pub fn search_by_name(&self, text: &str, from: usize, size: usize) -> ShareItResult<Vec<ItemDto>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let needle = text.to_lowercase();
        let items = self.items.get_all_items(PageRequest::of(from, size)?)?;
        Ok(items
            .iter()
            .filter(|item| {
                item.available
                    && (item.name.to_lowercase().contains(&needle)
                        || item.description.to_lowercase().contains(&needle))
            })
            .map(ItemDto::from)
            .collect())
    }

    // Bookings

    pub fn create_booking(&self, dto: &BookItemRequestDto, user_id: u64) -> ShareItResult<BookingDto> {
        let booker = self.users.get_user(user_id)?;
        let item = self.items.get_item(dto.item_id)?;
        let draft = BookingDraft::new(item, booker)
            .set_start(dto.start)
            .set_end(dto.end);

        validator::check_booking(&draft, self.clock.now()).inspect_err(rejected("create_booking"))?;

        let (item, booker) = (draft.item.clone(), draft.booker.clone());
        let booking = self.bookings.create_booking(draft.finalise()?)?;
        Ok(BookingDto::new(&booking, &item, &booker))
    }

    /// Readable by the booker and the item owner only
    pub fn get_booking(&self, booking_id: u64, user_id: u64) -> ShareItResult<BookingDto> {
        let booking = self.bookings.get_booking(booking_id)?;
        let item = self.items.get_item(booking.item_id)?;

        if booking.booker_id != user_id && item.owner_id != user_id {
            return Err(ShareItError::not_found(
                "Only the booker or the item owner can view this booking",
            ))
            .inspect_err(rejected("get_booking"));
        }

        let booker = self.users.get_user(booking.booker_id)?;
        Ok(BookingDto::new(&booking, &item, &booker))
    }

    /// Owner's approve/reject decision. The write is a compare-and-swap, so
    /// when two decisions race the loser re-reads and re-checks; a loser that
    /// now sees an approved booking fails like any late approval.
    pub fn set_status(&self, booking_id: u64, user_id: u64, approved: bool) -> ShareItResult<BookingDto> {
        loop {
            let booking = self.bookings.get_booking(booking_id)?;
            let item = self.items.get_item(booking.item_id)?;

            if item.owner_id != user_id {
                return Err(ShareItError::not_found(
                    "Only the item owner can change the booking status",
                ))
                .inspect_err(rejected("set_status"));
            }
            let status = booking
                .status
                .decide(approved)
                .inspect_err(rejected("set_status"))?;

            if let Some(updated) = self.bookings.update_status(&booking, status)? {
                let booker = self.users.get_user(updated.booker_id)?;
                return Ok(BookingDto::new(&updated, &item, &booker));
            }
        }
    }

    pub fn get_all_booking_by_user(
        &self,
        user_id: u64,
        state: &str,
        from: usize,
        size: usize,
    ) -> ShareItResult<Vec<BookingDto>> {
        self.users.get_user(user_id)?;
        let state: BookingState = state.parse().inspect_err(rejected("get_all_booking_by_user"))?;

        let bookings = self
            .bookings
            .get_all_booking_by_user(user_id, state, PageRequest::of(from, size)?)?;
        self.booking_dtos(&bookings)
    }

    pub fn get_all_booking_by_owner(
        &self,
        user_id: u64,
        state: &str,
        from: usize,
        size: usize,
    ) -> ShareItResult<Vec<BookingDto>> {
        self.users.get_user(user_id)?;
        let state: BookingState = state.parse().inspect_err(rejected("get_all_booking_by_owner"))?;

        let bookings = self
            .bookings
            .get_all_booking_by_owner(user_id, state, PageRequest::of(from, size)?)?;
        self.booking_dtos(&bookings)
    }

    // Comments

    /// Only someone whose booking of the item has ended may comment on it
    pub fn create_comment(&self, user_id: u64, item_id: u64, text: &str) -> ShareItResult<CommentDto> {
        self.create_comment_inner(user_id, item_id, text)
            .inspect_err(rejected("create_comment"))
    }

    fn create_comment_inner(&self, user_id: u64, item_id: u64, text: &str) -> ShareItResult<CommentDto> {
        if text.trim().is_empty() {
            return Err(ShareItError::validation("Comment text must not be blank"));
        }

        let booking = self
            .bookings
            .get_booking_by_user_and_item(user_id, item_id)?
            .ok_or_else(|| {
                ShareItError::validation(format!("User {user_id} never booked item {item_id}"))
            })?;

        let now = self.clock.now();
        if booking.end > now {
            return Err(ShareItError::validation(
                "A comment can only be left after the booking has ended",
            ));
        }

        let comment = self.items.create_comment(Comment {
            id: 0,
            text: text.to_string(),
            item_id: booking.item_id,
            author_id: booking.booker_id,
            created: now,
        })?;
        let author = self.users.get_user(comment.author_id)?;
        Ok(CommentDto::new(&comment, &author))
    }

    // Item requests

    pub fn create_request(&self, user_id: u64, dto: &NewItemRequestDto) -> ShareItResult<ItemRequestDto> {
        if dto.description.trim().is_empty() {
            return Err(ShareItError::validation("Request description must not be blank"))
                .inspect_err(rejected("create_request"));
        }
        let requester = self.users.get_user(user_id)?;

        let request = self.requests.create_request(ItemRequest {
            id: 0,
            description: dto.description.clone(),
            requester_id: requester.id,
            created: self.clock.now(),
        })?;
        Ok(ItemRequestDto::new(&request, &[]))
    }

    pub fn get_requests_by_user(&self, user_id: u64) -> ShareItResult<Vec<ItemRequestDto>> {
        self.users.get_user(user_id)?;
        let requests = self.requests.get_requests_by_user(user_id)?;
        self.request_dtos(&requests)
    }

    pub fn get_requests_by_param(
        &self,
        user_id: u64,
        from: usize,
        size: usize,
    ) -> ShareItResult<Vec<ItemRequestDto>> {
        let requests = self
            .requests
            .get_requests_by_param(user_id, PageRequest::of(from, size)?)?;
        self.request_dtos(&requests)
    }

    pub fn get_request(&self, user_id: u64, request_id: u64) -> ShareItResult<ItemRequestDto> {
        self.users.get_user(user_id)?;
        let request = self.requests.get_request(request_id)?;
        let items = self.items.get_all_by_requests_id(&[request_id])?;
        Ok(ItemRequestDto::new(&request, &items))
    }

    fn comment_dtos(&self, item_id: u64) -> ShareItResult<Vec<CommentDto>> {
        self.items
            .get_comments_by_item(item_id)?
            .iter()
            .map(|comment| {
                let author = self.users.get_user(comment.author_id)?;
                Ok(CommentDto::new(comment, &author))
            })
            .collect()
    }

    fn booking_dtos(&self, bookings: &[Booking]) -> ShareItResult<Vec<BookingDto>> {
        bookings
            .iter()
            .map(|booking| {
                let item = self.items.get_item(booking.item_id)?;
                let booker = self.users.get_user(booking.booker_id)?;
                Ok(BookingDto::new(booking, &item, &booker))
            })
            .collect()
    }

    fn request_dtos(&self, requests: &[ItemRequest]) -> ShareItResult<Vec<ItemRequestDto>> {
        let ids: Vec<u64> = requests.iter().map(|r| r.id).collect();
        let items = self.items.get_all_by_requests_id(&ids)?;

        Ok(requests
            .iter()
            .map(|request| {
                let fulfilling: Vec<Item> = items
                    .iter()
                    .filter(|item| item.request_id == Some(request.id))
                    .cloned()
                    .collect();
                ItemRequestDto::new(request, &fulfilling)
            })
            .collect())
    }
}
