use super::error::{ShareItError, ShareItResult};
use super::model::ItemRequest;
use super::page::PageRequest;
use super::storage::RecordStore;
use std::sync::Arc;

pub struct ItemRequestService {
    requests: Arc<dyn RecordStore<ItemRequest>>,
}

impl ItemRequestService {
    pub fn new(requests: Arc<dyn RecordStore<ItemRequest>>) -> Self {
        Self { requests }
    }

    pub fn create_request(&self, request: ItemRequest) -> ShareItResult<ItemRequest> {
        let request = self.requests.save(request)?;
        tracing::info!(
            request_id = request.id,
            requester_id = request.requester_id,
            "item request created"
        );
        Ok(request)
    }

    /// The user's own requests, oldest first
    pub fn get_requests_by_user(&self, user_id: u64) -> ShareItResult<Vec<ItemRequest>> {
        let mut own: Vec<ItemRequest> = self
            .requests
            .scan()?
            .into_iter()
            .filter(|r| r.requester_id == user_id)
            .collect();
        own.sort_by_key(|r| r.created);
        Ok(own)
    }

    /// Everybody else's requests, one page in id order
    pub fn get_requests_by_param(
        &self,
        user_id: u64,
        page: PageRequest,
    ) -> ShareItResult<Vec<ItemRequest>> {
        let others = self
            .requests
            .scan()?
            .into_iter()
            .filter(|r| r.requester_id != user_id);
        Ok(page.apply(others))
    }

    pub fn get_request(&self, id: u64) -> ShareItResult<ItemRequest> {
        self.requests
            .get(id)?
            .ok_or_else(|| ShareItError::not_found(format!("No item request with id = {id}")))
    }
}
