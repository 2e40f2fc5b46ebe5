//! Day-record documents: a day owns meals, a meal owns foods.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::nutrition::NutritionSummary;

/// A food entry inside a meal.
///
/// `nutrition` is scaled to the serving actually eaten; `reference_nutrition`
/// holds the per-100 g source values and is never summed into parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    /// Unique within the owning meal; assigned at insertion when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// Serving size in grams.
    #[serde(default)]
    pub serving: i64,
    #[serde(default, skip_serializing_if = "NutritionSummary::is_empty")]
    pub nutrition: NutritionSummary,
    #[serde(default, skip_serializing_if = "NutritionSummary::is_empty")]
    pub reference_nutrition: NutritionSummary,
}

impl Food {
    pub fn validate(&self) -> Result<()> {
        if self.serving < 0 {
            return Err(Error::Validation(format!(
                "food {:?} has a negative serving size: {}",
                self.name, self.serving
            )));
        }
        Ok(())
    }

    /// Recompute `nutrition` from the per-100 g reference values and the
    /// current serving size. Scaled values that leave the representable
    /// range are `Error::Validation` and leave `nutrition` unchanged.
    pub fn rescale(&mut self) -> Result<()> {
        let factor = Decimal::from(self.serving) / Decimal::from(100);
        self.nutrition = self.reference_nutrition.scaled(factor)?;
        Ok(())
    }
}

/// One meal of a day: a named list of foods plus their nutrition total.
///
/// `nutrition` is maintained by whoever edits `foods` (see
/// [`Meal::recompute_nutrition`]); the day-level aggregate treats it as the
/// meal's authoritative total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    /// Unique within the owning day; assigned at insertion when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Free text; "breakfast"/"lunch"/"dinner" additionally drive display
    /// order.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foods: Vec<Food>,
    #[serde(default, skip_serializing_if = "NutritionSummary::is_empty")]
    pub nutrition: NutritionSummary,
}

impl Meal {
    pub fn validate(&self) -> Result<()> {
        for food in &self.foods {
            food.validate()?;
        }
        Ok(())
    }

    /// Set `nutrition` to the element-wise sum of the foods' nutrition.
    pub fn recompute_nutrition(&mut self) -> Result<()> {
        self.nutrition = NutritionSummary::sum(self.foods.iter().map(|f| &f.nutrition))?;
        Ok(())
    }

    /// Give every food an id, generating fresh ones for missing or
    /// duplicated entries. Ids already unique within the meal are kept.
    pub(crate) fn ensure_food_ids(&mut self) {
        let mut seen: HashSet<Uuid> = HashSet::new();
        for food in &mut self.foods {
            let mut id = food.id.unwrap_or_else(Uuid::new_v4);
            while !seen.insert(id) {
                id = Uuid::new_v4();
            }
            food.id = Some(id);
        }
    }
}

/// Everything one user ate on one calendar day, plus the running nutrition
/// total over all meals.
///
/// `date` is an opaque string key; `user_id` is a back-reference to the
/// owning user, not an ownership relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub id: Uuid,
    pub date: String,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meals: Vec<Meal>,
    #[serde(default, skip_serializing_if = "NutritionSummary::is_empty")]
    pub nutrition: NutritionSummary,
}

impl DayRecord {
    /// Fresh, empty day for `(user_id, date)`.
    pub fn new(user_id: Uuid, date: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: date.into(),
            user_id,
            meals: Vec::new(),
            nutrition: NutritionSummary::default(),
        }
    }
}
