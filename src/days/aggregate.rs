//! Day-level aggregate maintenance.
//!
//! Meal insertion, replacement and removal all funnel through
//! [`apply_meal_delta`] so that `day.nutrition` stays the element-wise sum of
//! the meals currently on the day. Every mutation either applies fully or
//! leaves the day untouched; a missing meal id and a total leaving the
//! representable range both error without partial effect. Display ordering
//! lives here too since it is applied on every read path.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::nutrition::{apply_meal_delta, Sign};

use super::model::{DayRecord, Meal};

/// Display rank: breakfast < lunch < dinner < everything else.
fn meal_rank(name: &str) -> u8 {
    match name.trim().to_lowercase().as_str() {
        "breakfast" => 0,
        "lunch" => 1,
        "dinner" => 2,
        _ => 3,
    }
}

/// Order meals for display: breakfast, lunch, dinner, then everything else in
/// its original relative order.
///
/// Matching is case-insensitive and ignores surrounding whitespace; the sort
/// is stable, so unrecognized names never swap among themselves.
pub fn order_meals(meals: &mut [Meal]) {
    meals.sort_by_key(|meal| meal_rank(&meal.name));
}

impl DayRecord {
    /// Append `meal`, folding its nutrition into the day total.
    ///
    /// The meal gets a fresh id when it has none, or when the supplied id is
    /// already taken by another meal of this day; foods are handled the same
    /// way within the meal. Returns the id the meal was stored under, or
    /// [`Error::Validation`] when a day total would leave the representable
    /// range.
    pub fn add_meal(&mut self, mut meal: Meal) -> Result<Uuid> {
        let mut id = meal.id.unwrap_or_else(Uuid::new_v4);
        while self.meal_index(id).is_some() {
            id = Uuid::new_v4();
        }
        meal.id = Some(id);
        meal.ensure_food_ids();
        self.nutrition = apply_meal_delta(&self.nutrition, &meal.nutrition, Sign::Plus)?;
        self.meals.push(meal);
        Ok(id)
    }

    /// Swap the meal stored under `meal_id` for `meal`, adjusting the day
    /// total by the difference.
    ///
    /// The path id is authoritative: the stored meal keeps `meal_id` even if
    /// the body carried a different one. An absent id is [`Error::NotFound`]
    /// and leaves the day untouched.
    pub fn replace_meal(&mut self, meal_id: Uuid, mut meal: Meal) -> Result<()> {
        let idx = self.meal_index(meal_id).ok_or(Error::NotFound)?;
        meal.id = Some(meal_id);
        meal.ensure_food_ids();
        let without_old =
            apply_meal_delta(&self.nutrition, &self.meals[idx].nutrition, Sign::Minus)?;
        self.nutrition = apply_meal_delta(&without_old, &meal.nutrition, Sign::Plus)?;
        self.meals[idx] = meal;
        Ok(())
    }

    /// Remove and return the meal stored under `meal_id`, subtracting its
    /// nutrition from the day total. An absent id is [`Error::NotFound`] and
    /// leaves the day untouched.
    pub fn remove_meal(&mut self, meal_id: Uuid) -> Result<Meal> {
        let idx = self.meal_index(meal_id).ok_or(Error::NotFound)?;
        let remaining =
            apply_meal_delta(&self.nutrition, &self.meals[idx].nutrition, Sign::Minus)?;
        let meal = self.meals.remove(idx);
        self.nutrition = remaining;
        Ok(meal)
    }

    /// First meal position with this id. Ids are unique within a day by
    /// construction; on a foreign document with duplicates the first match
    /// wins.
    fn meal_index(&self, meal_id: Uuid) -> Option<usize> {
        self.meals.iter().position(|m| m.id == Some(meal_id))
    }
}
