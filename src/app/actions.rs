use uuid::Uuid;

use super::{apply_category_patch, drop_if_orphaned, map_card, remove_category, TemplateEditor};
use crate::model::{Category, CategoryPatch, EventCard, NewCategory, NEW_CATEGORY_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    /// A brand-new category styled like the card.
    Create,
    /// Fold the card's single-member category into another one.
    Fuse,
    /// Move just this card to another category.
    Switch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySuggestion {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub kind: SuggestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryEditOutcome {
    Unchanged,
    Renamed { category: Uuid },
    Fused { from: Uuid, into: Uuid },
    Switched { to: Uuid },
    Created { category: Uuid },
    Unassigned { removed: Option<Uuid> },
    Assigned { category: Uuid, created: bool },
}

impl TemplateEditor {
    /// Suggestions for the card's category input given the text typed so far.
    pub fn category_suggestions(&self, card: Uuid, input: &str) -> Vec<CategorySuggestion> {
        let state = self.state();
        let Some(found) = state.card(card) else {
            return Vec::new();
        };
        let current = state.category_of(found);
        let members = current.map(|category| state.cards_in_category(category.uuid));
        let kind = if members == Some(1) {
            SuggestionKind::Fuse
        } else {
            SuggestionKind::Switch
        };

        let mut suggestions = Vec::new();
        let shared_or_absent = members.map_or(true, |count| count > 1);
        let differs = current.map_or(true, |category| category.name != input);
        if shared_or_absent && differs && !input.is_empty() {
            suggestions.push(CategorySuggestion {
                category_id: None,
                name: input.to_string(),
                kind: SuggestionKind::Create,
            });
        }

        let others: Vec<&Category> = state
            .categories
            .iter()
            .filter(|category| Some(category.uuid) != current.map(|c| c.uuid))
            .collect();
        let needle = input.to_lowercase();
        let matching: Vec<&Category> = others
            .iter()
            .copied()
            .filter(|category| category.name.to_lowercase().contains(&needle))
            .collect();
        let listed = if matching.is_empty() { others } else { matching };
        suggestions.extend(listed.into_iter().map(|category| CategorySuggestion {
            category_id: Some(category.uuid),
            name: category.name.clone(),
            kind,
        }));
        suggestions
    }

    /// Applies a typed category name to the card.
    ///
    /// Sole member: an unknown name renames in place, a known one fuses into
    /// it. Shared category: a known name switches the card over, an unknown
    /// one creates a new category for it.
    pub fn edit_card_category(&mut self, card: Uuid, name: &str) -> CategoryEditOutcome {
        if self.card(card).is_none() {
            return CategoryEditOutcome::Unchanged;
        }
        let Some(current) = self.resolve_card_category(card) else {
            return CategoryEditOutcome::Unchanged;
        };
        if name.is_empty() || name == current.name {
            return CategoryEditOutcome::Unchanged;
        }
        let members = self.cards_in_category(current.uuid);
        let existing = self
            .categories()
            .iter()
            .find(|category| category.uuid != current.uuid && category.name == name)
            .cloned();
        match existing {
            Some(target) if members == 1 => self.fuse(current.uuid, target.uuid),
            Some(target) => self.switch(card, &target),
            None if members == 1 => {
                let patch = CategoryPatch {
                    name: Some(name.to_string()),
                    ..Default::default()
                };
                self.commit(|prev| apply_category_patch(prev, current.uuid, &patch));
                CategoryEditOutcome::Renamed {
                    category: current.uuid,
                }
            }
            None => self.create_for(card, name),
        }
    }

    pub fn apply_category_suggestion(
        &mut self,
        card: Uuid,
        suggestion: &CategorySuggestion,
    ) -> CategoryEditOutcome {
        if self.card(card).is_none() {
            return CategoryEditOutcome::Unchanged;
        }
        let target = suggestion
            .category_id
            .and_then(|id| self.category(id))
            .cloned();
        match (suggestion.kind, target) {
            (SuggestionKind::Create, _) => self.create_for(card, &suggestion.name),
            (SuggestionKind::Fuse, Some(target)) => {
                let Some(current) = self.resolve_card_category(card) else {
                    return CategoryEditOutcome::Unchanged;
                };
                if current.uuid == target.uuid || self.cards_in_category(current.uuid) > 1 {
                    return CategoryEditOutcome::Unchanged;
                }
                self.fuse(current.uuid, target.uuid)
            }
            (SuggestionKind::Switch, Some(target)) => self.switch(card, &target),
            (_, None) => CategoryEditOutcome::Unchanged,
        }
    }

    /// The "no category" checkbox.
    ///
    /// Checking it unassigns the card and drops the category if the card was
    /// its only member. Unchecking joins the first category, creating one when
    /// none exist.
    pub fn set_card_uncategorized(&mut self, card: Uuid, uncategorized: bool) -> CategoryEditOutcome {
        let Some(found) = self.card(card).cloned() else {
            return CategoryEditOutcome::Unchanged;
        };
        let current = self.resolve_card_category(card);
        if uncategorized {
            let Some(current) = current else {
                return CategoryEditOutcome::Unchanged;
            };
            let sole_member = self.cards_in_category(current.uuid) == 1;
            self.commit(|prev| {
                let next = map_card(prev, card, |entry| EventCard {
                    category_id: None,
                    ..entry.clone()
                });
                drop_if_orphaned(next, current.uuid)
            });
            return CategoryEditOutcome::Unassigned {
                removed: sole_member.then_some(current.uuid),
            };
        }

        if current.is_some() {
            return CategoryEditOutcome::Unchanged;
        }
        match self.categories().first().cloned() {
            Some(first) => {
                self.commit(|prev| map_card(prev, card, |entry| entry.join(&first)));
                CategoryEditOutcome::Assigned {
                    category: first.uuid,
                    created: false,
                }
            }
            None => {
                let category = Category::create(NewCategory::styled_like(NEW_CATEGORY_NAME, &found));
                let uuid = category.uuid;
                self.commit(|prev| {
                    let mut next = map_card(prev, card, |entry| EventCard {
                        category_id: Some(uuid),
                        ..entry.clone()
                    });
                    next.categories.push(category);
                    next
                });
                CategoryEditOutcome::Assigned {
                    category: uuid,
                    created: true,
                }
            }
        }
    }

    fn fuse(&mut self, from: Uuid, into: Uuid) -> CategoryEditOutcome {
        self.commit(|prev| remove_category(prev, from, Some(into)));
        tracing::debug!(%from, %into, "category fused");
        CategoryEditOutcome::Fused { from, into }
    }

    fn switch(&mut self, card: Uuid, target: &Category) -> CategoryEditOutcome {
        self.commit(|prev| {
            let previous = prev.card(card).and_then(|entry| entry.category_id);
            let next = map_card(prev, card, |entry| entry.join(target));
            match previous {
                Some(previous) if previous != target.uuid => drop_if_orphaned(next, previous),
                _ => next,
            }
        });
        CategoryEditOutcome::Switched { to: target.uuid }
    }

    fn create_for(&mut self, card: Uuid, name: &str) -> CategoryEditOutcome {
        let Some(found) = self.card(card).cloned() else {
            return CategoryEditOutcome::Unchanged;
        };
        let category = Category::create(NewCategory::styled_like(name, &found));
        let uuid = category.uuid;
        self.commit(|prev| {
            let previous = prev.card(card).and_then(|entry| entry.category_id);
            let mut next = map_card(prev, card, |entry| EventCard {
                category_id: Some(uuid),
                ..entry.clone()
            });
            next.categories.push(category);
            match previous {
                Some(previous) => drop_if_orphaned(next, previous),
                None => next,
            }
        });
        tracing::debug!(%card, category = %uuid, "category created for card");
        CategoryEditOutcome::Created { category: uuid }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;
    use crate::config::HistoryConfig;
    use crate::model::{Color, EventCardPatch};
    use crate::storage::MemoryStorage;

    fn editor() -> TemplateEditor {
        TemplateEditor::open(Arc::new(MemoryStorage::new()), &HistoryConfig::default())
    }

    fn name_category(editor: &mut TemplateEditor, uuid: Uuid, name: &str) {
        editor.update_category(
            uuid,
            CategoryPatch {
                name: Some(name.into()),
                ..Default::default()
            },
        );
    }

    #[test]
    fn sole_member_renames_in_place() {
        let mut editor = editor();
        let card = editor.cards()[0].uuid;
        let category = editor.categories()[0].uuid;

        let outcome = editor.edit_card_category(card, "Concerts");
        assert_eq!(outcome, CategoryEditOutcome::Renamed { category });
        assert_eq!(editor.categories().len(), 1);
        assert_eq!(editor.category(category).unwrap().name, "Concerts");
    }

    #[test]
    fn sole_member_fuses_into_matching_category() {
        let mut editor = editor();
        let card = editor.cards()[0].uuid;
        let original = editor.categories()[0].uuid;
        let talks = editor.add_category(NewCategory {
            name: "Talks".into(),
            text_color: Color::parse("#FFFFFF").unwrap(),
            background_color: Color::template_blue(),
        });

        let outcome = editor.edit_card_category(card, "Talks");
        assert_eq!(
            outcome,
            CategoryEditOutcome::Fused {
                from: original,
                into: talks.uuid
            }
        );
        assert!(editor.category(original).is_none());
        let card = editor.card(card).unwrap();
        assert_eq!(card.category_id, Some(talks.uuid));
        assert_eq!(card.background_color, Color::template_blue());
    }

    #[test]
    fn shared_category_switches_only_this_card() {
        let mut editor = editor();
        let first = editor.cards()[0].uuid;
        let shared = editor.categories()[0].uuid;
        let second = editor.add_card(None);
        assert_eq!(editor.card(second).unwrap().category_id, Some(shared));
        let talks = editor.add_category(NewCategory::named("Talks"));

        let outcome = editor.edit_card_category(second, "Talks");
        assert_eq!(outcome, CategoryEditOutcome::Switched { to: talks.uuid });
        assert_eq!(editor.card(second).unwrap().category_id, Some(talks.uuid));
        assert_eq!(editor.card(first).unwrap().category_id, Some(shared));
        assert!(editor.category(shared).is_some());
    }

    #[test]
    fn shared_category_with_unknown_name_creates_one() {
        let mut editor = editor();
        let shared = editor.categories()[0].uuid;
        let second = editor.add_card(None);
        editor.update_card(
            second,
            EventCardPatch {
                background_color: Some(Color::template_blue()),
                ..Default::default()
            },
        );

        let outcome = editor.edit_card_category(second, "Workshops");
        let created = assert_matches!(outcome, CategoryEditOutcome::Created { category } => category);
        let category = editor.category(created).unwrap();
        assert_eq!(category.name, "Workshops");
        assert_eq!(category.background_color, Color::template_blue());
        assert_eq!(editor.card(second).unwrap().category_id, Some(created));
        assert!(editor.category(shared).is_some());
        assert_eq!(editor.categories().len(), 2);
    }

    #[test]
    fn empty_or_identical_names_are_ignored() {
        let mut editor = editor();
        let card = editor.cards()[0].uuid;
        let category = editor.categories()[0].uuid;
        name_category(&mut editor, category, "Music");
        let before = editor.state().clone();

        assert_eq!(editor.edit_card_category(card, ""), CategoryEditOutcome::Unchanged);
        assert_eq!(
            editor.edit_card_category(card, "Music"),
            CategoryEditOutcome::Unchanged
        );
        assert_eq!(editor.state(), &before);
    }

    #[test]
    fn uncategorized_card_ignores_name_edits() {
        let mut editor = editor();
        let card = editor.cards()[0].uuid;
        editor.set_card_uncategorized(card, true);
        assert_eq!(
            editor.edit_card_category(card, "Anything"),
            CategoryEditOutcome::Unchanged
        );
    }

    #[test]
    fn checking_no_category_drops_sole_member_category() {
        let mut editor = editor();
        let card = editor.cards()[0].uuid;
        let category = editor.categories()[0].uuid;

        let outcome = editor.set_card_uncategorized(card, true);
        assert_eq!(
            outcome,
            CategoryEditOutcome::Unassigned {
                removed: Some(category)
            }
        );
        assert_eq!(editor.card(card).unwrap().category_id, None);
        assert!(editor.categories().is_empty());
    }

    #[test]
    fn checking_no_category_keeps_shared_category() {
        let mut editor = editor();
        let card = editor.cards()[0].uuid;
        let category = editor.categories()[0].uuid;
        editor.add_card(None);

        let outcome = editor.set_card_uncategorized(card, true);
        assert_eq!(outcome, CategoryEditOutcome::Unassigned { removed: None });
        assert!(editor.category(category).is_some());
    }

    #[test]
    fn unchecking_with_no_categories_creates_one() {
        let mut editor = editor();
        let card = editor.cards()[0].uuid;
        editor.set_card_uncategorized(card, true);
        assert!(editor.categories().is_empty());

        let outcome = editor.set_card_uncategorized(card, false);
        let created = assert_matches!(
            outcome,
            CategoryEditOutcome::Assigned { category, created: true } => category
        );
        assert_eq!(editor.category(created).unwrap().name, NEW_CATEGORY_NAME);
        assert_eq!(editor.card(card).unwrap().category_id, Some(created));
    }

    #[test]
    fn unchecking_joins_the_first_category() {
        let mut editor = editor();
        let first = editor.categories()[0].uuid;
        let card = editor.add_card(None);
        editor.set_card_uncategorized(card, true);

        let outcome = editor.set_card_uncategorized(card, false);
        assert_eq!(
            outcome,
            CategoryEditOutcome::Assigned {
                category: first,
                created: false
            }
        );
    }

    #[test]
    fn suggestions_offer_fuse_for_sole_member() {
        let mut editor = editor();
        let card = editor.cards()[0].uuid;
        editor.add_category(NewCategory::named("Talks"));
        editor.add_category(NewCategory::named("Theatre"));

        let suggestions = editor.category_suggestions(card, "ta");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].name, "Talks");
        assert_eq!(suggestions[0].kind, SuggestionKind::Fuse);

        // Nothing matches: every other category is listed.
        let suggestions = editor.category_suggestions(card, "zzz");
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(|s| s.kind == SuggestionKind::Fuse));
    }

    #[test]
    fn suggestions_offer_create_and_switch_for_shared_category() {
        let mut editor = editor();
        let card = editor.add_card(None);
        editor.add_category(NewCategory::named("Talks"));

        let suggestions = editor.category_suggestions(card, "Tal");
        assert_eq!(suggestions[0].kind, SuggestionKind::Create);
        assert_eq!(suggestions[0].name, "Tal");
        assert_eq!(suggestions[1].kind, SuggestionKind::Switch);
        assert_eq!(suggestions[1].name, "Talks");
    }

    #[test]
    fn applying_a_switch_suggestion_moves_the_card() {
        let mut editor = editor();
        let card = editor.add_card(None);
        let talks = editor.add_category(NewCategory::named("Talks"));
        let suggestion = editor
            .category_suggestions(card, "Talks")
            .into_iter()
            .find(|s| s.kind == SuggestionKind::Switch)
            .unwrap();

        let outcome = editor.apply_category_suggestion(card, &suggestion);
        assert_eq!(outcome, CategoryEditOutcome::Switched { to: talks.uuid });
        assert_eq!(editor.card(card).unwrap().category_id, Some(talks.uuid));
    }

    #[test]
    fn fuse_suggestion_is_refused_for_shared_category() {
        let mut editor = editor();
        let card = editor.add_card(None);
        let talks = editor.add_category(NewCategory::named("Talks"));
        let suggestion = CategorySuggestion {
            category_id: Some(talks.uuid),
            name: talks.name.clone(),
            kind: SuggestionKind::Fuse,
        };
        assert_eq!(
            editor.apply_category_suggestion(card, &suggestion),
            CategoryEditOutcome::Unchanged
        );
    }
}
