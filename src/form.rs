//! Translation of urlencoded recipe forms into typed submissions.
//!
//! Browser forms send ingredient rows as indexed field pairs
//! (`list_of_products_0`, `quantities_0`, ...). Everything past this module
//! works with [`IngredientSlot`] lists instead.

use std::collections::HashMap;

use crate::error::{AppError, FieldError};
use crate::nutrition::IngredientSlot;
use crate::recipes::RecipeDraft;

pub const PRODUCT_FIELD_PREFIX: &str = "list_of_products_";
pub const QUANTITY_FIELD_PREFIX: &str = "quantities_";

/// Reads slots `0..max_slots`. The result always has `max_slots` entries;
/// absent fields are `None`.
pub fn slots_from_fields(
    fields: &HashMap<String, String>,
    max_slots: usize,
) -> Vec<IngredientSlot> {
    (0..max_slots)
        .map(|i| IngredientSlot {
            product: fields.get(&format!("{PRODUCT_FIELD_PREFIX}{i}")).cloned(),
            quantity: fields.get(&format!("{QUANTITY_FIELD_PREFIX}{i}")).cloned(),
        })
        .collect()
}

fn text_field(fields: &HashMap<String, String>, name: &str) -> String {
    fields.get(name).cloned().unwrap_or_default()
}

fn int_field(
    fields: &HashMap<String, String>,
    name: &'static str,
    errors: &mut Vec<FieldError>,
) -> i32 {
    match fields.get(name).map(|v| v.trim()) {
        None | Some("") => {
            errors.push(FieldError::new(name, "This field is required."));
            0
        }
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.push(FieldError::new(name, "Not a valid integer value."));
            0
        }),
    }
}

/// Builds a draft from form fields. A field that is not an integer is
/// reported together with every text-field error [`RecipeDraft::validate`]
/// finds; range checks on parsed integers are left to `validate`.
pub fn draft_from_fields(fields: &HashMap<String, String>) -> Result<RecipeDraft, AppError> {
    let mut errors = Vec::new();

    let draft = RecipeDraft {
        name: text_field(fields, "name"),
        description: text_field(fields, "description"),
        prep_time: int_field(fields, "prep_time", &mut errors),
        servings: int_field(fields, "servings", &mut errors),
        cook_time: int_field(fields, "cook_time", &mut errors),
        instructions: text_field(fields, "instructions"),
    };

    if errors.is_empty() {
        return Ok(draft);
    }

    if let Err(AppError::Validation(others)) = draft.validate() {
        let unparsed: Vec<&'static str> = errors.iter().map(|e| e.field).collect();
        errors.extend(others.into_iter().filter(|e| !unparsed.contains(&e.field)));
    }
    Err(AppError::Validation(errors))
}
