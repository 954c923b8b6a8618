//! Nutrition aggregation for submitted ingredient lists.
//!
//! Each submitted slot is a `(product, quantity)` pair. Accepted slots are
//! kept in submission order; only those whose quantity parses and whose
//! product resolves contribute `value_per_100 * quantity / 100` to the total.

use serde::{Deserialize, Serialize};

use crate::models::NutritionRecord;
use crate::repository::{NutritionRepository, StoreError};

pub const DEFAULT_MAX_SLOTS: usize = 50;

pub const INVALID_QUANTITY_MESSAGE: &str = "Please enter a valid quantity for all ingredients.";

/// One submitted ingredient position. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientSlot {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
}

impl IngredientSlot {
    pub fn new(product: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            product: Some(product.into()),
            quantity: Some(quantity.into()),
        }
    }

    fn filled(&self) -> Option<(&str, &str)> {
        match (self.product.as_deref(), self.quantity.as_deref()) {
            (Some(product), Some(quantity)) if !product.is_empty() && !quantity.is_empty() => {
                Some((product, quantity))
            }
            _ => None,
        }
    }
}

/// What an accepted entry's product resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Product {
    /// Quantity did not parse, so the name was never looked up.
    Name(String),
    Record(NutritionRecord),
    /// Quantity parsed but no record carries this name.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientEntry {
    /// The product name as submitted.
    #[serde(skip)]
    pub name: String,
    pub product: Product,
    pub quantity: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionTotal {
    #[serde(rename = "Calories")]
    pub calories: f64,
    #[serde(rename = "Protein")]
    pub protein: f64,
    #[serde(rename = "Carbohydrate")]
    pub carbohydrate: f64,
    #[serde(rename = "Fat")]
    pub fat: f64,
}

impl NutritionTotal {
    pub fn accumulate(&mut self, record: &NutritionRecord, quantity: f64) {
        self.calories += record.calories_per_100 * quantity / 100.0;
        self.protein += record.protein_per_100 * quantity / 100.0;
        self.carbohydrate += record.carbohydrates_per_100 * quantity / 100.0;
        self.fat += record.fat_per_100 * quantity / 100.0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityWarning {
    pub slot: usize,
    pub product: String,
    pub quantity: String,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    pub ingredients: Vec<IngredientEntry>,
    pub total: NutritionTotal,
    pub warnings: Vec<QuantityWarning>,
}

/// Parses a quantity the way a user would type it. Surrounding whitespace is
/// ignored; infinities and NaN are rejected so they cannot poison the total.
pub fn parse_quantity(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Aggregates at most `max_slots` slots against `lookup`.
///
/// Only a failing lookup is an error. Bad quantities become warnings and
/// unknown products are tolerated; both still appear in `ingredients`.
pub fn aggregate<L>(
    slots: &[IngredientSlot],
    max_slots: usize,
    lookup: &L,
) -> Result<Aggregation, StoreError>
where
    L: NutritionRepository + ?Sized,
{
    let mut aggregation = Aggregation::default();

    for (index, slot) in slots.iter().take(max_slots).enumerate() {
        let Some((name, quantity_text)) = slot.filled() else {
            continue;
        };

        let product = match parse_quantity(quantity_text) {
            None => {
                log::warn!(
                    "Invalid quantity {:?} for {:?} in slot {}",
                    quantity_text,
                    name,
                    index
                );
                aggregation.warnings.push(QuantityWarning {
                    slot: index,
                    product: name.to_string(),
                    quantity: quantity_text.to_string(),
                    message: INVALID_QUANTITY_MESSAGE,
                });
                Product::Name(name.to_string())
            }
            Some(quantity) => match lookup.find_by_name(name)? {
                Some(record) => {
                    aggregation.total.accumulate(&record, quantity);
                    Product::Record(record)
                }
                None => {
                    log::debug!("No nutrition record named {:?}", name);
                    Product::Unresolved
                }
            },
        };

        aggregation.ingredients.push(IngredientEntry {
            name: name.to_string(),
            product,
            quantity: quantity_text.to_string(),
        });
    }

    Ok(aggregation)
}

/// Totals already-stored `(product, quantity)` pairs. Entries that would
/// have produced a warning at submission time are skipped silently.
pub fn stored_total<'a, L, I>(entries: I, lookup: &L) -> Result<NutritionTotal, StoreError>
where
    L: NutritionRepository + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut total = NutritionTotal::default();
    for (name, quantity_text) in entries {
        let Some(quantity) = parse_quantity(quantity_text) else {
            continue;
        };
        if let Some(record) = lookup.find_by_name(name)? {
            total.accumulate(&record, quantity);
        }
    }
    Ok(total)
}

/// A fixed, in-memory nutrition reference table.
#[derive(Debug, Clone, Default)]
pub struct NutritionTable {
    records: Vec<NutritionRecord>,
}

impl NutritionTable {
    pub fn new(mut records: Vec<NutritionRecord>) -> Self {
        records.sort_by_key(|record| record.id);
        Self { records }
    }

    pub fn records(&self) -> &[NutritionRecord] {
        &self.records
    }
}

impl NutritionRepository for NutritionTable {
    fn find_by_name(&self, name: &str) -> Result<Option<NutritionRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .find(|record| record.name == name)
            .cloned())
    }

    fn list_product_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.records.iter().map(|r| r.name.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
