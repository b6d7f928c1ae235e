//! Record storage with a swappable backing
//!
//! Services only see [`RecordStore`]. Production wires [`SledStore`], one
//! sled tree per entity keyed by big-endian ids so iteration yields records
//! in id order. Tests can wire [`MemoryStore`] instead.
use super::config::{Config, StorageBackend};
use super::error::{ShareItError, ShareItResult};
use super::model::{Booking, Comment, Item, ItemRequest, User};
use anyhow::Context;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const SEQUENCES: &str = "sequences";

pub trait Record:
    Clone
    + PartialEq
    + Send
    + Sync
    + minicbor::Encode<()>
    + for<'b> minicbor::Decode<'b, ()>
    + 'static
{
    const TABLE: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

macro_rules! impl_record {
    ($ty:ty, $table:literal) => {
        impl Record for $ty {
            const TABLE: &'static str = $table;

            fn id(&self) -> u64 {
                self.id
            }
            fn set_id(&mut self, id: u64) {
                self.id = id;
            }
        }
    };
}

impl_record!(User, "users");
impl_record!(Item, "items");
impl_record!(Booking, "bookings");
impl_record!(Comment, "comments");
impl_record!(ItemRequest, "requests");

pub trait RecordStore<T: Record>: Send + Sync {
    /// Next unused id for this table, starting at 1
    fn next_id(&self) -> ShareItResult<u64>;
    fn get(&self, id: u64) -> ShareItResult<Option<T>>;
    fn put(&self, record: &T) -> ShareItResult<()>;
    fn remove(&self, id: u64) -> ShareItResult<bool>;
    /// Every record, ascending by id
    fn scan(&self) -> ShareItResult<Vec<T>>;
    /// Replace `current` with `new` only if the stored record still equals
    /// `current`. Returns `false` when it does not.
    fn compare_and_swap(&self, current: &T, new: &T) -> ShareItResult<bool>;

    /// Insert or overwrite, assigning an id to unsaved records
    fn save(&self, mut record: T) -> ShareItResult<T> {
        if record.id() == 0 {
            record.set_id(self.next_id()?);
        }
        self.put(&record)?;
        Ok(record)
    }
}

fn key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn encode<T: Record>(record: &T) -> ShareItResult<Vec<u8>> {
    minicbor::to_vec(record).map_err(|e| ShareItError::Codec(e.to_string()))
}

fn increment(old: Option<&[u8]>) -> Option<Vec<u8>> {
    let current = old
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map(u64::from_be_bytes)
        .unwrap_or(0);

    Some((current + 1).to_be_bytes().to_vec())
}

pub struct SledStore<T> {
    tree: sled::Tree,
    sequences: sled::Tree,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> SledStore<T> {
    pub fn open(db: &sled::Db) -> ShareItResult<Self> {
        Ok(Self {
            tree: db.open_tree(T::TABLE)?,
            sequences: db.open_tree(SEQUENCES)?,
            _record: PhantomData,
        })
    }
}

impl<T: Record> RecordStore<T> for SledStore<T> {
    fn next_id(&self) -> ShareItResult<u64> {
        self.sequences
            .update_and_fetch(T::TABLE, increment)?
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_ref()).ok())
            .map(u64::from_be_bytes)
            .ok_or_else(|| ShareItError::Codec(format!("corrupt id sequence for {}", T::TABLE)))
    }

    fn get(&self, id: u64) -> ShareItResult<Option<T>> {
        match self.tree.get(key(id))? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, record: &T) -> ShareItResult<()> {
        self.tree.insert(key(record.id()), encode(record)?)?;
        Ok(())
    }

    fn remove(&self, id: u64) -> ShareItResult<bool> {
        Ok(self.tree.remove(key(id))?.is_some())
    }

    fn scan(&self) -> ShareItResult<Vec<T>> {
        self.tree
            .iter()
            .values()
            .map(|value| -> ShareItResult<T> {
                let value = value?;
                Ok(minicbor::decode(&value)?)
            })
            .collect()
    }

    fn compare_and_swap(&self, current: &T, new: &T) -> ShareItResult<bool> {
        let swapped = self.tree.compare_and_swap(
            key(current.id()),
            Some(encode(current)?),
            Some(encode(new)?),
        )?;
        Ok(swapped.is_ok())
    }
}

pub struct MemoryStore<T> {
    rows: RwLock<BTreeMap<u64, T>>,
    sequence: AtomicU64,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            sequence: AtomicU64::new(0),
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> RecordStore<T> for MemoryStore<T> {
    fn next_id(&self) -> ShareItResult<u64> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn get(&self, id: u64) -> ShareItResult<Option<T>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    fn put(&self, record: &T) -> ShareItResult<()> {
        self.rows.write().insert(record.id(), record.clone());
        Ok(())
    }

    fn remove(&self, id: u64) -> ShareItResult<bool> {
        Ok(self.rows.write().remove(&id).is_some())
    }

    fn scan(&self) -> ShareItResult<Vec<T>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    fn compare_and_swap(&self, current: &T, new: &T) -> ShareItResult<bool> {
        let mut rows = self.rows.write();
        match rows.get_mut(&current.id()) {
            Some(stored) if stored == current => {
                *stored = new.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// One store per entity, shared by every service
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn RecordStore<User>>,
    pub items: Arc<dyn RecordStore<Item>>,
    pub bookings: Arc<dyn RecordStore<Booking>>,
    pub comments: Arc<dyn RecordStore<Comment>>,
    pub requests: Arc<dyn RecordStore<ItemRequest>>,
    db: Option<Arc<sled::Db>>,
}

impl Storage {
    pub fn sled(db: Arc<sled::Db>) -> ShareItResult<Self> {
        Ok(Self {
            users: Arc::new(SledStore::<User>::open(&db)?),
            items: Arc::new(SledStore::<Item>::open(&db)?),
            bookings: Arc::new(SledStore::<Booking>::open(&db)?),
            comments: Arc::new(SledStore::<Comment>::open(&db)?),
            requests: Arc::new(SledStore::<ItemRequest>::open(&db)?),
            db: Some(db),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryStore::<User>::new()),
            items: Arc::new(MemoryStore::<Item>::new()),
            bookings: Arc::new(MemoryStore::<Booking>::new()),
            comments: Arc::new(MemoryStore::<Comment>::new()),
            requests: Arc::new(MemoryStore::<ItemRequest>::new()),
            db: None,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match config.storage {
            StorageBackend::Memory => Ok(Self::in_memory()),
            StorageBackend::Sled => {
                let db = sled::open(&config.db_path).with_context(|| {
                    format!("failed to open sled database at {}", config.db_path.display())
                })?;
                Ok(Self::sled(Arc::new(db))?)
            }
        }
    }

    /// Force pending sled writes to disk. No-op in memory.
    pub fn flush(&self) -> ShareItResult<()> {
        if let Some(db) = &self.db {
            db.flush()?;
        }
        Ok(())
    }
}
