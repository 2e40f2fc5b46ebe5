//! Nutrient summaries and the arithmetic that keeps them consistent.
//!
//! A [`NutritionSummary`] is a fixed, closed set of nutrient slots; the same
//! shape hangs off a food (per serving), a meal (sum of its foods) and a day
//! (sum of its meals). [`apply_meal_delta`] is the single primitive every
//! aggregate update goes through.
//!
//! Values are [`Decimal`] rather than floats so that adding a meal and then
//! removing it restores the previous summary bit-for-bit. The arithmetic is
//! checked: a total that would leave the representable range comes back as a
//! validation error instead of panicking.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The closed set of tracked nutrients.
///
/// The set is fixed by the document schema; anything else in an incoming
/// summary is rejected as a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NutrientKey {
    Calories,
    Protein,
    Carbs,
    Fat,
    Sugar,
    Fiber,
    Sodium,
    Calcium,
    Iron,
    Cholesterol,
    Potassium,
    VitaminA,
    VitaminC,
}

impl NutrientKey {
    /// Every tracked nutrient, in document order.
    pub const ALL: [NutrientKey; 13] = [
        NutrientKey::Calories,
        NutrientKey::Protein,
        NutrientKey::Carbs,
        NutrientKey::Fat,
        NutrientKey::Sugar,
        NutrientKey::Fiber,
        NutrientKey::Sodium,
        NutrientKey::Calcium,
        NutrientKey::Iron,
        NutrientKey::Cholesterol,
        NutrientKey::Potassium,
        NutrientKey::VitaminA,
        NutrientKey::VitaminC,
    ];

    /// Canonical document key for this nutrient.
    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientKey::Calories => "calories",
            NutrientKey::Protein => "protein",
            NutrientKey::Carbs => "carbs",
            NutrientKey::Fat => "fat",
            NutrientKey::Sugar => "sugar",
            NutrientKey::Fiber => "fiber",
            NutrientKey::Sodium => "sodium",
            NutrientKey::Calcium => "calcium",
            NutrientKey::Iron => "iron",
            NutrientKey::Cholesterol => "cholesterol",
            NutrientKey::Potassium => "potassium",
            NutrientKey::VitaminA => "vitaminA",
            NutrientKey::VitaminC => "vitaminC",
        }
    }
}

impl fmt::Display for NutrientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NutrientKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NutrientKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown nutrient key: {s}")))
    }
}

/// A single nutrient measurement.
///
/// `nutrient_name` and `unit_name` are descriptive metadata sourced from the
/// food database; only `value` accumulates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrient {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nutrient_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit_name: String,
    #[serde(default)]
    pub value: Decimal,
}

impl Nutrient {
    pub fn new(nutrient_name: impl Into<String>, unit_name: impl Into<String>, value: Decimal) -> Self {
        Self {
            nutrient_name: nutrient_name.into(),
            unit_name: unit_name.into(),
            value,
        }
    }
}

/// Accumulated nutrient totals for a food, a meal or a day.
///
/// Absent slots are treated as zero by all arithmetic. Unknown keys in an
/// incoming document fail deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NutritionSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calcium: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iron: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cholesterol: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potassium: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitamin_a: Option<Nutrient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitamin_c: Option<Nutrient>,
}

impl NutritionSummary {
    pub fn get(&self, key: NutrientKey) -> Option<&Nutrient> {
        self.slot(key).as_ref()
    }

    /// Value for `key`, with absent slots reading as zero.
    pub fn value(&self, key: NutrientKey) -> Decimal {
        self.get(key).map(|n| n.value).unwrap_or(Decimal::ZERO)
    }

    pub fn slot_mut(&mut self, key: NutrientKey) -> &mut Option<Nutrient> {
        match key {
            NutrientKey::Calories => &mut self.calories,
            NutrientKey::Protein => &mut self.protein,
            NutrientKey::Carbs => &mut self.carbs,
            NutrientKey::Fat => &mut self.fat,
            NutrientKey::Sugar => &mut self.sugar,
            NutrientKey::Fiber => &mut self.fiber,
            NutrientKey::Sodium => &mut self.sodium,
            NutrientKey::Calcium => &mut self.calcium,
            NutrientKey::Iron => &mut self.iron,
            NutrientKey::Cholesterol => &mut self.cholesterol,
            NutrientKey::Potassium => &mut self.potassium,
            NutrientKey::VitaminA => &mut self.vitamin_a,
            NutrientKey::VitaminC => &mut self.vitamin_c,
        }
    }

    fn slot(&self, key: NutrientKey) -> &Option<Nutrient> {
        match key {
            NutrientKey::Calories => &self.calories,
            NutrientKey::Protein => &self.protein,
            NutrientKey::Carbs => &self.carbs,
            NutrientKey::Fat => &self.fat,
            NutrientKey::Sugar => &self.sugar,
            NutrientKey::Fiber => &self.fiber,
            NutrientKey::Sodium => &self.sodium,
            NutrientKey::Calcium => &self.calcium,
            NutrientKey::Iron => &self.iron,
            NutrientKey::Cholesterol => &self.cholesterol,
            NutrientKey::Potassium => &self.potassium,
            NutrientKey::VitaminA => &self.vitamin_a,
            NutrientKey::VitaminC => &self.vitamin_c,
        }
    }

    pub fn is_empty(&self) -> bool {
        NutrientKey::ALL.iter().all(|key| self.get(*key).is_none())
    }

    /// Element-wise sum of `parts`, starting from an empty summary.
    pub fn sum<'a, I>(parts: I) -> Result<NutritionSummary>
    where
        I: IntoIterator<Item = &'a NutritionSummary>,
    {
        let mut total = NutritionSummary::default();
        for part in parts {
            total = apply_meal_delta(&total, part, Sign::Plus)?;
        }
        Ok(total)
    }

    /// Value-wise scaling; metadata is carried over unchanged.
    pub fn scaled(&self, factor: Decimal) -> Result<NutritionSummary> {
        let mut out = NutritionSummary::default();
        for key in NutrientKey::ALL {
            if let Some(n) = self.get(key) {
                let value = n
                    .value
                    .checked_mul(factor)
                    .ok_or_else(|| out_of_range(key))?;
                *out.slot_mut(key) = Some(Nutrient {
                    nutrient_name: n.nutrient_name.clone(),
                    unit_name: n.unit_name.clone(),
                    value,
                });
            }
        }
        Ok(out)
    }
}

/// Direction of an aggregate update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn factor(&self) -> Decimal {
        match self {
            Sign::Plus => Decimal::ONE,
            Sign::Minus => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Fold one meal's nutrition into a day summary.
///
/// Per nutrient key, independently: the value is accumulated
/// (`day + sign * meal`) while name and unit are overwritten from the meal
/// slot (last writer wins). A slot absent on the meal leaves the day slot
/// untouched; a slot absent on the day picks up the signed meal value.
///
/// Callers keep the day-level sum invariant by invoking this symmetrically:
/// subtract the outgoing meal, add the incoming one.
///
/// A total outside [`Decimal`]'s representable range is
/// [`Error::Validation`]; nothing is partially applied.
pub fn apply_meal_delta(
    day: &NutritionSummary,
    meal: &NutritionSummary,
    sign: Sign,
) -> Result<NutritionSummary> {
    let mut out = NutritionSummary::default();
    for key in NutrientKey::ALL {
        *out.slot_mut(key) = match (day.get(key), meal.get(key)) {
            (None, None) => None,
            (Some(d), None) => Some(d.clone()),
            // negating a Decimal never leaves the range, so only the
            // accumulate step needs a checked add
            (None, Some(m)) => Some(Nutrient {
                nutrient_name: m.nutrient_name.clone(),
                unit_name: m.unit_name.clone(),
                value: sign.factor() * m.value,
            }),
            (Some(d), Some(m)) => {
                let value = d
                    .value
                    .checked_add(sign.factor() * m.value)
                    .ok_or_else(|| out_of_range(key))?;
                Some(Nutrient {
                    nutrient_name: m.nutrient_name.clone(),
                    unit_name: m.unit_name.clone(),
                    value,
                })
            }
        };
    }
    Ok(out)
}

fn out_of_range(key: NutrientKey) -> Error {
    Error::Validation(format!("nutrient value out of range: {key}"))
}
