use super::dto::ItemPatch;
use super::error::{ShareItError, ShareItResult};
use super::model::{Comment, Item};
use super::page::PageRequest;
use super::storage::RecordStore;
use std::collections::HashSet;
use std::sync::Arc;

pub struct ItemService {
    items: Arc<dyn RecordStore<Item>>,
    comments: Arc<dyn RecordStore<Comment>>,
}

impl ItemService {
    pub fn new(items: Arc<dyn RecordStore<Item>>, comments: Arc<dyn RecordStore<Comment>>) -> Self {
        Self { items, comments }
    }

    pub fn create_item(&self, item: Item) -> ShareItResult<Item> {
        let item = self.items.save(item)?;
        tracing::info!(item_id = item.id, owner_id = item.owner_id, "item created");
        Ok(item)
    }

    pub fn get_item(&self, id: u64) -> ShareItResult<Item> {
        self.items
            .get(id)?
            .ok_or_else(|| ShareItError::not_found(format!("Item {id} not found")))
    }

    pub fn get_all_by_user(&self, owner_id: u64, page: PageRequest) -> ShareItResult<Vec<Item>> {
        let owned = self
            .items
            .scan()?
            .into_iter()
            .filter(|item| item.owner_id == owner_id);
        Ok(page.apply(owned))
    }

    pub fn get_all_by_requests_id(&self, request_ids: &[u64]) -> ShareItResult<Vec<Item>> {
        let wanted: HashSet<u64> = request_ids.iter().copied().collect();
        Ok(self
            .items
            .scan()?
            .into_iter()
            .filter(|item| item.request_id.is_some_and(|id| wanted.contains(&id)))
            .collect())
    }

    pub fn get_all_items(&self, page: PageRequest) -> ShareItResult<Vec<Item>> {
        Ok(page.apply(self.items.scan()?))
    }

    /// Merge every present field of `patch` into the stored item
    pub fn update_item(&self, id: u64, patch: &ItemPatch) -> ShareItResult<Item> {
        let mut item = self.get_item(id)?;

        if let Some(name) = &patch.name {
            item.name = name.clone();
        }
        if let Some(description) = &patch.description {
            item.description = description.clone();
        }
        if let Some(available) = patch.available {
            item.available = available;
        }

        self.items.put(&item)?;
        tracing::info!(item_id = id, "item updated");
        Ok(item)
    }

    pub fn delete_item(&self, id: u64) -> ShareItResult<String> {
        let item = self.get_item(id)?;
        self.items.remove(item.id)?;
        tracing::info!(item_id = id, "item deleted");
        Ok(format!("Deleted item with id = {id}"))
    }

    pub fn create_comment(&self, comment: Comment) -> ShareItResult<Comment> {
        let comment = self.comments.save(comment)?;
        tracing::info!(comment_id = comment.id, item_id = comment.item_id, "comment created");
        Ok(comment)
    }

    pub fn has_comments_by_author(&self, author_id: u64) -> ShareItResult<bool> {
        Ok(self.comments.scan()?.iter().any(|c| c.author_id == author_id))
    }

    pub fn get_comments_by_item(&self, item_id: u64) -> ShareItResult<Vec<Comment>> {
        Ok(self
            .comments
            .scan()?
            .into_iter()
            .filter(|c| c.item_id == item_id)
            .collect())
    }
}
