use std::sync::Arc;

use uuid::Uuid;

use crate::config::HistoryConfig;
use crate::history::{Clock, HistoryBuffer, SystemClock};
use crate::model::{
    Category, CategoryPatch, Color, Direction, EventCard, EventCardPatch, NewCategory,
    TemplateState, TitleCard, TitleCardPatch,
};
use crate::storage::{FieldStatus, LocalStorage, Persistence, StorageKey};

mod actions;
pub mod state;

pub use actions::{CategoryEditOutcome, CategorySuggestion, SuggestionKind};
pub use state::{ColorTarget, Selection};

/// Owns the template and everything that changes it.
///
/// Each mutation is a pure `TemplateState -> TemplateState` step fed through
/// the history buffer; afterwards the changed fields are mirrored to storage
/// and the selection is checked against the new entity set.
pub struct TemplateEditor {
    history: HistoryBuffer<TemplateState>,
    selected: Option<Selection>,
    persistence: Persistence,
    clock: Arc<dyn Clock>,
    loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mirror {
    Storage,
    Skip,
}

impl TemplateEditor {
    pub fn new(storage: Arc<dyn LocalStorage>, config: &HistoryConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        storage: Arc<dyn LocalStorage>,
        config: &HistoryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let history = HistoryBuffer::with_settings(
            TemplateState::default(),
            config.debounce_window(),
            config.capacity,
            clock.now(),
        );
        Self {
            history,
            selected: None,
            persistence: Persistence::new(storage),
            clock,
            loading: true,
        }
    }

    /// Builds the editor and rehydrates it from storage in one go.
    pub fn open(storage: Arc<dyn LocalStorage>, config: &HistoryConfig) -> Self {
        let mut editor = Self::new(storage, config);
        editor.rehydrate();
        editor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn state(&self) -> &TemplateState {
        self.history.current()
    }

    pub fn background_color(&self) -> &Color {
        &self.state().background_color
    }

    pub fn title_card(&self) -> &TitleCard {
        &self.state().title_card
    }

    pub fn cards(&self) -> &[EventCard] {
        &self.state().cards
    }

    pub fn categories(&self) -> &[Category] {
        &self.state().categories
    }

    pub fn card(&self, uuid: Uuid) -> Option<&EventCard> {
        self.state().card(uuid)
    }

    pub fn category(&self, uuid: Uuid) -> Option<&Category> {
        self.state().category(uuid)
    }

    pub fn cards_in_category(&self, uuid: Uuid) -> usize {
        self.state().cards_in_category(uuid)
    }

    pub fn selected(&self) -> Option<Selection> {
        self.selected
    }

    pub fn set_selected(&mut self, selection: Option<Selection>) {
        self.selected = selection;
    }

    pub fn select(&mut self, selection: Selection) {
        self.selected = Some(selection);
    }

    /// Reads every storage key once. A key that is missing, unreadable or
    /// fails validation keeps its compiled default; the others still load.
    pub fn rehydrate(&mut self) {
        for (key, status) in self.persistence.load_all() {
            match status {
                FieldStatus::Absent => {}
                FieldStatus::Valid(field) => {
                    self.commit_with(false, Mirror::Skip, |prev| field.apply_to(prev));
                }
                FieldStatus::Invalid(err) => {
                    tracing::warn!(key = key.name(), field = %err.field(), %err, "discarding stored value");
                }
                FieldStatus::Unreadable(err) => {
                    tracing::warn!(key = key.name(), ?err, "failed to read stored value");
                }
            }
        }
        if self.state().has_dangling_category_refs() {
            tracing::warn!("stored cards reference missing categories, unassigning them");
            self.commit_with(false, Mirror::Storage, TemplateState::without_dangling_category_refs);
        }
        self.loading = false;
        tracing::info!(
            cards = self.cards().len(),
            categories = self.categories().len(),
            "template rehydrated"
        );
    }

    /// Reads and validates every storage key without touching the template.
    pub fn stored_fields(&self) -> Vec<(StorageKey, FieldStatus)> {
        self.persistence.load_all()
    }

    /// Clears the stored keys and starts over from factory defaults as a new
    /// undo step, even inside the debounce window.
    pub fn reset_local_storage(&mut self) {
        if let Err(err) = self.persistence.clear() {
            tracing::error!(?err, "failed to clear local storage");
        }
        let kind = self
            .history
            .append_at(self.clock.now(), |_| TemplateState::default());
        tracing::debug!(?kind, cursor = self.history.cursor(), "history commit");
        self.selected = None;
        tracing::info!("template reset to defaults");
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_go_back()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_go_forward()
    }

    pub fn undo(&mut self) {
        let before = self.state().clone();
        self.history.go_back();
        self.after_navigation(&before);
    }

    pub fn redo(&mut self) {
        let before = self.state().clone();
        self.history.go_forward();
        self.after_navigation(&before);
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.commit(|prev| TemplateState {
            background_color: color,
            ..prev.clone()
        });
    }

    pub fn update_title_card(&mut self, patch: TitleCardPatch) {
        self.commit(|prev| TemplateState {
            title_card: prev.title_card.apply(&patch),
            ..prev.clone()
        });
    }

    /// Inserts a new card (appended when `at` is `None`, clamped to the end
    /// otherwise) and selects it.
    pub fn add_card(&mut self, at: Option<usize>) -> Uuid {
        let card = EventCard::new(self.categories().first().map(|category| category.uuid));
        let uuid = card.uuid;
        self.commit(|prev| {
            let mut next = prev.clone();
            let index = at.unwrap_or(next.cards.len()).min(next.cards.len());
            next.cards.insert(index, card);
            next
        });
        self.selected = Some(Selection::Card(uuid));
        tracing::debug!(%uuid, ?at, "card added");
        uuid
    }

    /// Merges `patch` into the card. Moving the last card out of a category
    /// removes that category.
    pub fn update_card(&mut self, uuid: Uuid, mut patch: EventCardPatch) {
        if self.card(uuid).is_none() {
            return;
        }
        if let Some(Some(category)) = patch.category_id {
            if self.category(category).is_none() {
                tracing::warn!(card = %uuid, %category, "ignoring assignment to a missing category");
                patch.category_id = None;
            }
        }
        self.commit(|prev| {
            let previous_category = prev.card(uuid).and_then(|card| card.category_id);
            let next = map_card(prev, uuid, |card| card.apply(&patch));
            match previous_category {
                Some(category) if patch.category_id.is_some() => drop_if_orphaned(next, category),
                _ => next,
            }
        });
    }

    /// Removes the card, together with its category when it was the last member.
    pub fn delete_card(&mut self, uuid: Uuid) {
        if self.card(uuid).is_none() {
            return;
        }
        let selection = state::selection_after_card_delete(self.selected, self.state(), uuid);
        self.commit(|prev| {
            let category = prev.card(uuid).and_then(|card| card.category_id);
            let next = TemplateState {
                cards: prev
                    .cards
                    .iter()
                    .filter(|card| card.uuid != uuid)
                    .cloned()
                    .collect(),
                ..prev.clone()
            };
            match category {
                Some(category) => drop_if_orphaned(next, category),
                None => next,
            }
        });
        self.selected = state::reconcile(selection, self.state());
        tracing::debug!(%uuid, "card deleted");
    }

    /// Moves a card `by` places; no-op when the target falls outside the list.
    pub fn move_card(&mut self, uuid: Uuid, direction: Direction, by: usize) {
        let Some(index) = self.state().card_index(uuid) else {
            return;
        };
        let len = self.cards().len();
        let target = match direction {
            Direction::Up => index.checked_sub(by),
            Direction::Down => index.checked_add(by).filter(|target| *target < len),
        };
        let Some(target) = target else {
            return;
        };
        if target == index {
            return;
        }
        self.commit(|prev| {
            let mut next = prev.clone();
            let card = next.cards.remove(index);
            next.cards.insert(target, card);
            next
        });
    }

    pub fn possible_directions(&self, uuid: Uuid) -> Vec<Direction> {
        let Some(index) = self.state().card_index(uuid) else {
            return Vec::new();
        };
        let mut directions = Vec::with_capacity(2);
        if index > 0 {
            directions.push(Direction::Up);
        }
        if index + 1 < self.cards().len() {
            directions.push(Direction::Down);
        }
        directions
    }

    pub fn add_category(&mut self, new: NewCategory) -> Category {
        let category = Category::create(new);
        let created = category.clone();
        self.commit(|prev| {
            let mut next = prev.clone();
            next.categories.push(category);
            next
        });
        created
    }

    /// Merges `patch` into the category. New colors cascade to every member card.
    pub fn update_category(&mut self, uuid: Uuid, patch: CategoryPatch) {
        self.update_category_with(uuid, |_| patch);
    }

    pub fn update_category_with<F>(&mut self, uuid: Uuid, updater: F)
    where
        F: FnOnce(&Category) -> CategoryPatch,
    {
        let Some(current) = self.category(uuid) else {
            return;
        };
        let patch = updater(current);
        self.commit(|prev| apply_category_patch(prev, uuid, &patch));
    }

    /// Removes the category; its cards move to `replace_with` (taking over its
    /// colors) or become uncategorized when it is `None` or does not exist.
    pub fn delete_category(&mut self, uuid: Uuid, replace_with: Option<Uuid>) {
        if self.category(uuid).is_none() {
            return;
        }
        self.commit(|prev| remove_category(prev, uuid, replace_with));
        if self.selected == Some(Selection::Category(uuid)) {
            self.selected = None;
        }
        tracing::debug!(%uuid, ?replace_with, "category deleted");
    }

    /// The card's category, nulling a stale reference on the way.
    pub fn resolve_card_category(&mut self, card: Uuid) -> Option<Category> {
        let found = self.card(card)?;
        let category_id = found.category_id?;
        if let Some(category) = self.category(category_id) {
            return Some(category.clone());
        }
        tracing::warn!(%card, %category_id, "card references a missing category, unassigning it");
        self.commit_with(false, Mirror::Storage, |prev| {
            map_card(prev, card, |entry| EventCard {
                category_id: None,
                ..entry.clone()
            })
        });
        None
    }

    pub fn selected_text(&self) -> Option<&str> {
        state::selected_text(self.selected, self.state())
    }

    pub fn selected_text_color(&self) -> Option<&Color> {
        state::selected_text_color(self.selected, self.state())
    }

    pub fn selected_background_color(&self) -> Option<&Color> {
        state::selected_background_color(self.selected, self.state())
    }

    pub fn selected_color(&self, target: ColorTarget) -> Option<&Color> {
        state::selected_color(self.selected, self.state(), target)
    }

    /// Writes the text of whatever is selected. The background has no text.
    pub fn set_selected_text(&mut self, text: &str) {
        match self.selected {
            None | Some(Selection::Background) => {}
            Some(Selection::Title) => self.update_title_card(TitleCardPatch {
                title: Some(text.to_string()),
                ..Default::default()
            }),
            Some(Selection::Card(uuid)) => self.update_card(
                uuid,
                EventCardPatch {
                    title: Some(text.to_string()),
                    ..Default::default()
                },
            ),
            Some(Selection::Category(uuid)) => self.update_category(
                uuid,
                CategoryPatch {
                    name: Some(text.to_string()),
                    ..Default::default()
                },
            ),
        }
    }

    pub fn set_selected_color(&mut self, target: ColorTarget, color: Color) {
        let (text_color, background_color) = match target {
            ColorTarget::Text => (Some(color.clone()), None),
            ColorTarget::Background => (None, Some(color.clone())),
        };
        match self.selected {
            None => {}
            Some(Selection::Background) => self.set_background_color(color),
            Some(Selection::Title) => self.update_title_card(TitleCardPatch {
                text_color,
                background_color,
                ..Default::default()
            }),
            Some(Selection::Card(uuid)) => self.update_card(
                uuid,
                EventCardPatch {
                    text_color,
                    background_color,
                    ..Default::default()
                },
            ),
            Some(Selection::Category(uuid)) => self.update_category(
                uuid,
                CategoryPatch {
                    text_color,
                    background_color,
                    ..Default::default()
                },
            ),
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn commit<F>(&mut self, producer: F)
    where
        F: FnOnce(&TemplateState) -> TemplateState,
    {
        self.commit_with(true, Mirror::Storage, producer);
    }

    fn commit_with<F>(&mut self, force_new_entry: bool, mirror: Mirror, producer: F)
    where
        F: FnOnce(&TemplateState) -> TemplateState,
    {
        let before = self.state().clone();
        let now = self.clock.now();
        let kind = self.history.commit_at(now, producer, force_new_entry);
        tracing::debug!(
            ?kind,
            cursor = self.history.cursor(),
            entries = self.history.len(),
            "history commit"
        );
        if mirror == Mirror::Storage {
            self.mirror(&before);
        }
        self.selected = state::reconcile(self.selected, self.state());
    }

    fn after_navigation(&mut self, before: &TemplateState) {
        tracing::debug!(cursor = self.history.cursor(), "history navigation");
        self.mirror(before);
        self.selected = state::reconcile(self.selected, self.state());
    }

    fn mirror(&self, before: &TemplateState) {
        if let Err(err) = self.persistence.persist_changes(before, self.state()) {
            tracing::error!(?err, "failed to mirror template to local storage");
        }
    }
}

/// Removes `category` once no card references it any more.
fn drop_if_orphaned(mut state: TemplateState, category: Uuid) -> TemplateState {
    if state.cards_in_category(category) == 0 {
        state.categories.retain(|existing| existing.uuid != category);
    }
    state
}

fn map_card<F>(state: &TemplateState, uuid: Uuid, f: F) -> TemplateState
where
    F: Fn(&EventCard) -> EventCard,
{
    TemplateState {
        cards: state
            .cards
            .iter()
            .map(|card| if card.uuid == uuid { f(card) } else { card.clone() })
            .collect(),
        ..state.clone()
    }
}

fn apply_category_patch(state: &TemplateState, uuid: Uuid, patch: &CategoryPatch) -> TemplateState {
    let categories = state
        .categories
        .iter()
        .map(|category| {
            if category.uuid == uuid {
                category.apply(patch)
            } else {
                category.clone()
            }
        })
        .collect();
    let cards = if patch.touches_colors() {
        state
            .cards
            .iter()
            .map(|card| {
                if card.category_id != Some(uuid) {
                    return card.clone();
                }
                EventCard {
                    text_color: patch
                        .text_color
                        .clone()
                        .unwrap_or_else(|| card.text_color.clone()),
                    background_color: patch
                        .background_color
                        .clone()
                        .unwrap_or_else(|| card.background_color.clone()),
                    ..card.clone()
                }
            })
            .collect()
    } else {
        state.cards.clone()
    };
    TemplateState {
        categories,
        cards,
        ..state.clone()
    }
}

fn remove_category(state: &TemplateState, uuid: Uuid, replace_with: Option<Uuid>) -> TemplateState {
    let replacement = replace_with
        .filter(|target| *target != uuid)
        .and_then(|target| state.category(target))
        .cloned();
    let cards = state
        .cards
        .iter()
        .map(|card| {
            if card.category_id != Some(uuid) {
                return card.clone();
            }
            match &replacement {
                Some(category) => card.join(category),
                None => EventCard {
                    category_id: None,
                    ..card.clone()
                },
            }
        })
        .collect();
    TemplateState {
        cards,
        categories: state
            .categories
            .iter()
            .filter(|category| category.uuid != uuid)
            .cloned()
            .collect(),
        ..state.clone()
    }
}
