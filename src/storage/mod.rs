use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::model::{Category, Color, EventCard, TemplateState, TitleCard};

pub mod schema;

pub use schema::ValidationError;

const STORAGE_TMP_EXTENSION: &str = "json.tmp";

/// String key/value storage in the manner of a browser's `localStorage`.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
pub enum StorageKey {
    #[strum(serialize = "templateBackgroundColor")]
    BackgroundColor,
    #[strum(serialize = "titleCard")]
    TitleCard,
    #[strum(serialize = "cards")]
    Cards,
    #[strum(serialize = "categories")]
    Categories,
}

impl StorageKey {
    pub fn all() -> impl Iterator<Item = StorageKey> {
        StorageKey::iter()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    fn changed(self, before: &TemplateState, after: &TemplateState) -> bool {
        match self {
            StorageKey::BackgroundColor => before.background_color != after.background_color,
            StorageKey::TitleCard => before.title_card != after.title_card,
            StorageKey::Cards => before.cards != after.cards,
            StorageKey::Categories => before.categories != after.categories,
        }
    }

    fn encode(self, state: &TemplateState) -> Result<String> {
        let encoded = match self {
            StorageKey::BackgroundColor => state.background_color.as_str().to_string(),
            StorageKey::TitleCard => {
                serde_json::to_string(&state.title_card).context("serializing title card")?
            }
            StorageKey::Cards => serde_json::to_string(&state.cards).context("serializing cards")?,
            StorageKey::Categories => {
                serde_json::to_string(&state.categories).context("serializing categories")?
            }
        };
        Ok(encoded)
    }
}

/// One persisted field that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredField {
    BackgroundColor(Color),
    TitleCard(TitleCard),
    Cards(Vec<EventCard>),
    Categories(Vec<Category>),
}

impl StoredField {
    pub fn apply_to(self, state: &TemplateState) -> TemplateState {
        let mut next = state.clone();
        match self {
            StoredField::BackgroundColor(color) => next.background_color = color,
            StoredField::TitleCard(card) => next.title_card = card,
            StoredField::Cards(cards) => next.cards = cards,
            StoredField::Categories(categories) => next.categories = categories,
        }
        next
    }
}

#[derive(Debug)]
pub enum FieldStatus {
    Absent,
    Valid(StoredField),
    Invalid(ValidationError),
    Unreadable(anyhow::Error),
}

/// Mirrors template state into local storage, one key per top-level field.
#[derive(Clone)]
pub struct Persistence {
    storage: Arc<dyn LocalStorage>,
}

impl Persistence {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Writes only the fields that differ between `before` and `after`.
    pub fn persist_changes(&self, before: &TemplateState, after: &TemplateState) -> Result<()> {
        for key in StorageKey::all().filter(|key| key.changed(before, after)) {
            let encoded = key.encode(after)?;
            self.storage
                .set_item(key.name(), &encoded)
                .with_context(|| format!("writing storage key {}", key.name()))?;
        }
        Ok(())
    }

    pub fn persist_all(&self, state: &TemplateState) -> Result<()> {
        for key in StorageKey::all() {
            let encoded = key.encode(state)?;
            self.storage
                .set_item(key.name(), &encoded)
                .with_context(|| format!("writing storage key {}", key.name()))?;
        }
        Ok(())
    }

    /// Reads and validates one key. Never fails as a whole.
    pub fn load_field(&self, key: StorageKey) -> FieldStatus {
        let raw = match self.storage.get_item(key.name()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return FieldStatus::Absent,
            Err(err) => return FieldStatus::Unreadable(err),
        };
        // A literal "undefined" is what a browser leaves behind for a missing value.
        if raw == "undefined" {
            return FieldStatus::Absent;
        }
        match decode(key, &raw) {
            Ok(field) => FieldStatus::Valid(field),
            Err(err) => FieldStatus::Invalid(err),
        }
    }

    pub fn load_all(&self) -> Vec<(StorageKey, FieldStatus)> {
        StorageKey::all()
            .map(|key| (key, self.load_field(key)))
            .collect()
    }

    pub fn clear(&self) -> Result<()> {
        for key in StorageKey::all() {
            self.storage
                .remove_item(key.name())
                .with_context(|| format!("removing storage key {}", key.name()))?;
        }
        Ok(())
    }
}

fn decode(key: StorageKey, raw: &str) -> Result<StoredField, ValidationError> {
    let json = |raw: &str| serde_json::from_str::<serde_json::Value>(raw);
    match key {
        StorageKey::BackgroundColor => {
            schema::validate_color(raw).map(StoredField::BackgroundColor)
        }
        StorageKey::TitleCard => {
            schema::validate_title_card(&json(raw)?).map(StoredField::TitleCard)
        }
        StorageKey::Cards => schema::validate_event_cards(&json(raw)?).map(StoredField::Cards),
        StorageKey::Categories => {
            schema::validate_categories(&json(raw)?).map(StoredField::Categories)
        }
    }
}

/// Cloneable in-memory storage; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<IndexMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.lock().shift_remove(key);
        Ok(())
    }
}

/// Local storage kept as one JSON object on disk, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<IndexMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating storage directory {}", parent.display()))?;
        }
        let entries = match fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<IndexMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(?err, "ignoring unreadable storage file {}", path.display());
                    IndexMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => IndexMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("reading storage {}", path.display()))
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &IndexMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries).context("serialising storage entries")?;
        let tmp_path = self.path.with_extension(STORAGE_TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .with_context(|| format!("writing temporary storage file {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("atomically persisting storage {}", self.path.display()))?;
        Ok(())
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.shift_remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}
