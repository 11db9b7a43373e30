use uuid::Uuid;

use crate::model::{Color, TemplateState};

/// The single active edit target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    Background,
    Title,
    Card(Uuid),
    Category(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorTarget {
    #[default]
    Text,
    Background,
}

impl Selection {
    /// Whether the selection still points at something in `state`.
    pub fn resolves_in(&self, state: &TemplateState) -> bool {
        match self {
            Selection::Background | Selection::Title => true,
            Selection::Card(uuid) => state.card(*uuid).is_some(),
            Selection::Category(uuid) => state.category(*uuid).is_some(),
        }
    }
}

/// Drops a selection whose entity is gone.
pub fn reconcile(selection: Option<Selection>, state: &TemplateState) -> Option<Selection> {
    selection.filter(|selected| selected.resolves_in(state))
}

/// Where the selection goes when card `deleted` is removed from `before`.
///
/// Previous card in list order, else the following one when the deleted card
/// was first, else nothing.
pub fn selection_after_card_delete(
    selection: Option<Selection>,
    before: &TemplateState,
    deleted: Uuid,
) -> Option<Selection> {
    if selection != Some(Selection::Card(deleted)) {
        return selection;
    }
    let index = before.card_index(deleted)?;
    let neighbour = if index > 0 {
        before.cards.get(index - 1)
    } else {
        before.cards.get(1)
    };
    neighbour.map(|card| Selection::Card(card.uuid))
}

pub fn selected_text(selection: Option<Selection>, state: &TemplateState) -> Option<&str> {
    match selection? {
        Selection::Background => None,
        Selection::Title => Some(state.title_card.title.as_str()),
        Selection::Card(uuid) => state.card(uuid).map(|card| card.title.as_str()),
        Selection::Category(uuid) => state.category(uuid).map(|category| category.name.as_str()),
    }
}

pub fn selected_text_color(selection: Option<Selection>, state: &TemplateState) -> Option<&Color> {
    match selection? {
        Selection::Background => None,
        Selection::Title => Some(&state.title_card.text_color),
        Selection::Card(uuid) => state.card(uuid).map(|card| &card.text_color),
        Selection::Category(uuid) => state.category(uuid).map(|category| &category.text_color),
    }
}

pub fn selected_background_color(
    selection: Option<Selection>,
    state: &TemplateState,
) -> Option<&Color> {
    match selection? {
        Selection::Background => Some(&state.background_color),
        Selection::Title => Some(&state.title_card.background_color),
        Selection::Card(uuid) => state.card(uuid).map(|card| &card.background_color),
        Selection::Category(uuid) => {
            state.category(uuid).map(|category| &category.background_color)
        }
    }
}

/// The panel background only has one color, whichever target is asked for.
pub fn selected_color(
    selection: Option<Selection>,
    state: &TemplateState,
    target: ColorTarget,
) -> Option<&Color> {
    match (selection?, target) {
        (Selection::Background, _) | (_, ColorTarget::Background) => {
            selected_background_color(selection, state)
        }
        (_, ColorTarget::Text) => selected_text_color(selection, state),
    }
}
