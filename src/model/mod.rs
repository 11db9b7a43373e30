use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

pub mod color;

pub use color::{Color, InvalidColor};

const TEMPLATE_NAMESPACE: Uuid = Uuid::from_u128(0x8a3e7d6f_af5c_4bfb_b0be_2d1a5e4d6f9f);

pub const NEW_CARD_TITLE: &str = "New Event";
pub const NEW_CATEGORY_NAME: &str = "New Category";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleCard {
    pub title: String,
    pub text_color: Color,
    pub background_color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
    pub uuid: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub text_color: Color,
    pub background_color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub uuid: Uuid,
    pub name: String,
    pub text_color: Color,
    pub background_color: Color,
}

/// Everything the history buffer snapshots: one value per undo step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateState {
    pub background_color: Color,
    pub title_card: TitleCard,
    pub cards: Vec<EventCard>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleCardPatch {
    pub title: Option<String>,
    pub text_color: Option<Color>,
    pub background_color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCardPatch {
    pub title: Option<String>,
    pub text_color: Option<Color>,
    pub background_color: Option<Color>,
    /// `Some(None)` unassigns the card.
    pub category_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub text_color: Option<Color>,
    pub background_color: Option<Color>,
}

impl CategoryPatch {
    pub fn touches_colors(&self) -> bool {
        self.text_color.is_some() || self.background_color.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub text_color: Color,
    pub background_color: Color,
}

impl NewCategory {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text_color: Color::template_yellow(),
            background_color: Color::template_magenta(),
        }
    }

    /// A category that starts out with the card's current colors.
    pub fn styled_like(name: impl Into<String>, card: &EventCard) -> Self {
        Self {
            name: name.into(),
            text_color: card.text_color.clone(),
            background_color: card.background_color.clone(),
        }
    }
}

impl TitleCard {
    pub fn apply(&self, patch: &TitleCardPatch) -> Self {
        Self {
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            text_color: patch
                .text_color
                .clone()
                .unwrap_or_else(|| self.text_color.clone()),
            background_color: patch
                .background_color
                .clone()
                .unwrap_or_else(|| self.background_color.clone()),
        }
    }
}

impl EventCard {
    pub fn new(category_id: Option<Uuid>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            category_id,
            title: NEW_CARD_TITLE.to_string(),
            text_color: Color::template_yellow(),
            background_color: Color::template_magenta(),
        }
    }

    pub fn apply(&self, patch: &EventCardPatch) -> Self {
        Self {
            uuid: self.uuid,
            category_id: patch.category_id.unwrap_or(self.category_id),
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            text_color: patch
                .text_color
                .clone()
                .unwrap_or_else(|| self.text_color.clone()),
            background_color: patch
                .background_color
                .clone()
                .unwrap_or_else(|| self.background_color.clone()),
        }
    }

    /// Joins `category`, taking over its colors.
    pub fn join(&self, category: &Category) -> Self {
        Self {
            category_id: Some(category.uuid),
            text_color: category.text_color.clone(),
            background_color: category.background_color.clone(),
            ..self.clone()
        }
    }
}

impl Category {
    pub fn create(new: NewCategory) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: new.name,
            text_color: new.text_color,
            background_color: new.background_color,
        }
    }

    pub fn apply(&self, patch: &CategoryPatch) -> Self {
        Self {
            uuid: self.uuid,
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            text_color: patch
                .text_color
                .clone()
                .unwrap_or_else(|| self.text_color.clone()),
            background_color: patch
                .background_color
                .clone()
                .unwrap_or_else(|| self.background_color.clone()),
        }
    }
}

impl TemplateState {
    pub fn card(&self, uuid: Uuid) -> Option<&EventCard> {
        self.cards.iter().find(|card| card.uuid == uuid)
    }

    pub fn card_index(&self, uuid: Uuid) -> Option<usize> {
        self.cards.iter().position(|card| card.uuid == uuid)
    }

    pub fn category(&self, uuid: Uuid) -> Option<&Category> {
        self.categories.iter().find(|category| category.uuid == uuid)
    }

    pub fn cards_in_category(&self, uuid: Uuid) -> usize {
        self.cards
            .iter()
            .filter(|card| card.category_id == Some(uuid))
            .count()
    }

    /// The card's category, or `None` when unassigned or the reference is stale.
    pub fn category_of(&self, card: &EventCard) -> Option<&Category> {
        card.category_id.and_then(|id| self.category(id))
    }

    pub fn has_dangling_category_refs(&self) -> bool {
        self.cards
            .iter()
            .any(|card| card.category_id.is_some() && self.category_of(card).is_none())
    }

    /// Nulls every `category_id` that does not resolve.
    pub fn without_dangling_category_refs(&self) -> Self {
        let cards = self
            .cards
            .iter()
            .map(|card| match card.category_id {
                Some(id) if self.category(id).is_none() => EventCard {
                    category_id: None,
                    ..card.clone()
                },
                _ => card.clone(),
            })
            .collect();
        Self {
            cards,
            ..self.clone()
        }
    }
}

pub fn default_category_id() -> Uuid {
    Uuid::new_v5(&TEMPLATE_NAMESPACE, b"category-1")
}

pub fn default_card_id() -> Uuid {
    Uuid::new_v5(&TEMPLATE_NAMESPACE, b"card-1")
}

pub fn default_title_card() -> TitleCard {
    TitleCard {
        title: String::new(),
        text_color: Color::template_yellow(),
        background_color: Color::template_magenta(),
    }
}

pub fn default_cards() -> Vec<EventCard> {
    vec![EventCard {
        uuid: default_card_id(),
        title: String::new(),
        ..EventCard::new(Some(default_category_id()))
    }]
}

pub fn default_categories() -> Vec<Category> {
    vec![Category {
        uuid: default_category_id(),
        name: String::new(),
        text_color: Color::template_yellow(),
        background_color: Color::template_magenta(),
    }]
}

impl Default for TemplateState {
    /// Factory defaults: one untitled card linked to one unnamed category.
    fn default() -> Self {
        Self {
            background_color: Color::template_background(),
            title_card: default_title_card(),
            cards: default_cards(),
            categories: default_categories(),
        }
    }
}
