use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Category, Color, EventCard, TitleCard};

/// First impossible field of a stored value, named by path (`cards[1].textColor`).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field}: missing")]
    MissingField { field: String },
    #[error("{field}: expected {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("{field}: expected a #RRGGBB hex color, got {value:?}")]
    InvalidColor { field: String, value: String },
    #[error("{field}: invalid uuid {value:?}")]
    InvalidUuid { field: String, value: String },
    #[error("{array}[{index}].{source}")]
    Element {
        array: String,
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Path of the offending field.
    pub fn field(&self) -> String {
        match self {
            Self::Json(_) => String::new(),
            Self::MissingField { field }
            | Self::WrongType { field, .. }
            | Self::InvalidColor { field, .. }
            | Self::InvalidUuid { field, .. } => field.clone(),
            Self::Element {
                array,
                index,
                source,
            } => format!("{array}[{index}].{}", source.field()),
        }
    }
}

pub fn validate_color(raw: &str) -> Result<Color, ValidationError> {
    color_value(raw, "color")
}

pub fn validate_title_card(value: &Value) -> Result<TitleCard, ValidationError> {
    let fields = object(value, "titleCard")?;
    Ok(TitleCard {
        title: string_field(fields, "title")?,
        text_color: color_field(fields, "textColor")?,
        background_color: color_field(fields, "backgroundColor")?,
    })
}

pub fn validate_event_card(value: &Value) -> Result<EventCard, ValidationError> {
    let fields = object(value, "card")?;
    Ok(EventCard {
        uuid: uuid_field(fields, "uuid")?,
        category_id: nullable_uuid_field(fields, "categoryId")?,
        title: string_field(fields, "title")?,
        text_color: color_field(fields, "textColor")?,
        background_color: color_field(fields, "backgroundColor")?,
    })
}

pub fn validate_category(value: &Value) -> Result<Category, ValidationError> {
    let fields = object(value, "category")?;
    Ok(Category {
        uuid: uuid_field(fields, "uuid")?,
        name: string_field(fields, "name")?,
        text_color: color_field(fields, "textColor")?,
        background_color: color_field(fields, "backgroundColor")?,
    })
}

pub fn validate_event_cards(value: &Value) -> Result<Vec<EventCard>, ValidationError> {
    validate_array(value, "cards", validate_event_card)
}

pub fn validate_categories(value: &Value) -> Result<Vec<Category>, ValidationError> {
    validate_array(value, "categories", validate_category)
}

/// Accepts or rejects the whole array; one bad element fails it.
fn validate_array<T>(
    value: &Value,
    field: &str,
    element: fn(&Value) -> Result<T, ValidationError>,
) -> Result<Vec<T>, ValidationError> {
    let items = value.as_array().ok_or_else(|| ValidationError::WrongType {
        field: field.to_string(),
        expected: "an array",
    })?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(ValidationError::WrongType {
                    field: format!("{field}[{index}]"),
                    expected: "an object",
                });
            }
            element(item).map_err(|err| ValidationError::Element {
                array: field.to_string(),
                index,
                source: Box::new(err),
            })
        })
        .collect()
}

fn object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::WrongType {
        field: field.to_string(),
        expected: "an object",
    })
}

fn required<'a>(fields: &'a Map<String, Value>, field: &str) -> Result<&'a Value, ValidationError> {
    fields
        .get(field)
        .ok_or_else(|| ValidationError::MissingField {
            field: field.to_string(),
        })
}

fn string_field(fields: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    required(fields, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::WrongType {
            field: field.to_string(),
            expected: "a string",
        })
}

fn color_field(fields: &Map<String, Value>, field: &str) -> Result<Color, ValidationError> {
    let raw = required(fields, field)?
        .as_str()
        .ok_or_else(|| ValidationError::WrongType {
            field: field.to_string(),
            expected: "a color string",
        })?;
    color_value(raw, field)
}

fn color_value(raw: &str, field: &str) -> Result<Color, ValidationError> {
    Color::parse(raw).map_err(|_| ValidationError::InvalidColor {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn uuid_field(fields: &Map<String, Value>, field: &str) -> Result<Uuid, ValidationError> {
    let raw = required(fields, field)?
        .as_str()
        .ok_or_else(|| ValidationError::WrongType {
            field: field.to_string(),
            expected: "a uuid string",
        })?;
    Uuid::parse_str(raw).map_err(|_| ValidationError::InvalidUuid {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn nullable_uuid_field(
    fields: &Map<String, Value>,
    field: &str,
) -> Result<Option<Uuid>, ValidationError> {
    if required(fields, field)?.is_null() {
        return Ok(None);
    }
    uuid_field(fields, field).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn card_json() -> Value {
        json!({
            "uuid": "5b3c0b8e-2f6a-4d6e-9a53-1f0c7f3f8a11",
            "categoryId": null,
            "title": "Opening night",
            "textColor": "#FEED00",
            "backgroundColor": "#e5017c"
        })
    }

    #[test]
    fn color_validation_matches_strict_hex() {
        assert!(validate_color("#ABCDEF").is_ok());
        assert_matches!(
            validate_color("red"),
            Err(ValidationError::InvalidColor { .. })
        );
        assert!(validate_color("#ABC").is_err());
        assert!(validate_color("#GGGGGG").is_err());
    }

    #[test]
    fn title_card_round_trips_through_validation() -> anyhow::Result<()> {
        let card = crate::model::default_title_card();
        let value = serde_json::to_value(&card)?;
        assert_eq!(validate_title_card(&value)?, card);
        Ok(())
    }

    #[test]
    fn title_card_reports_first_bad_field() {
        let value = json!({ "title": "Hi", "textColor": "yellow", "backgroundColor": 3 });
        let err = validate_title_card(&value).unwrap_err();
        assert_matches!(err, ValidationError::InvalidColor { ref field, .. } if field == "textColor");
    }

    #[test]
    fn missing_field_is_reported() {
        let value = json!({ "title": "Hi", "textColor": "#000000" });
        let err = validate_title_card(&value).unwrap_err();
        assert_matches!(err, ValidationError::MissingField { ref field } if field == "backgroundColor");
    }

    #[test]
    fn event_card_accepts_null_and_uuid_category() -> anyhow::Result<()> {
        let card = validate_event_card(&card_json())?;
        assert_eq!(card.category_id, None);
        assert_eq!(card.background_color.as_str(), "#e5017c");

        let mut linked = card_json();
        linked["categoryId"] = json!("0b1f3f57-6f55-4a5c-8f3c-5b3f4b0f2d2e");
        assert!(validate_event_card(&linked)?.category_id.is_some());
        Ok(())
    }

    #[test]
    fn event_card_rejects_bad_uuid() {
        let mut value = card_json();
        value["uuid"] = json!("not-a-uuid");
        assert_matches!(
            validate_event_card(&value),
            Err(ValidationError::InvalidUuid { .. })
        );
    }

    #[test]
    fn one_bad_element_rejects_the_array() {
        let mut bad = card_json();
        bad["textColor"] = json!("#12345");
        let value = json!([card_json(), bad]);
        let err = validate_event_cards(&value).unwrap_err();
        assert_matches!(err, ValidationError::Element { index: 1, .. });
        assert_eq!(err.field(), "cards[1].textColor");
        assert!(err.to_string().starts_with("cards[1].textColor: "));
    }

    #[test]
    fn non_object_element_is_named_by_index() {
        let err = validate_categories(&json!([42])).unwrap_err();
        assert_eq!(err.field(), "categories[0]");
    }

    #[test]
    fn non_array_is_rejected() {
        assert_matches!(
            validate_categories(&json!({})),
            Err(ValidationError::WrongType { .. })
        );
        assert_eq!(validate_categories(&json!([])).unwrap().len(), 0);
    }

    #[test]
    fn category_validation_requires_every_field() {
        let value = json!({
            "uuid": "0b1f3f57-6f55-4a5c-8f3c-5b3f4b0f2d2e",
            "textColor": "#FFFFFF",
            "backgroundColor": "#000000"
        });
        assert_matches!(
            validate_category(&value),
            Err(ValidationError::MissingField { ref field }) if field == "name"
        );
    }
}
