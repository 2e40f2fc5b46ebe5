//! Day-level operations over a [`DayStore`].
//!
//! Mutations run a fetch, apply, compare-and-swap loop: the day is read with
//! its version, mutated in memory through the aggregate ops, and written back
//! conditionally. Losing the race means retrying with fresh state, up to a
//! configurable budget. Read paths hand meals back in display order.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::aggregate::order_meals;
use super::model::{DayRecord, Meal};
use super::repo::DayStore;

/// Conflict retries a mutating operation gets before giving up.
pub const DEFAULT_WRITE_RETRIES: u32 = 5;

#[derive(Clone)]
pub struct DayService {
    store: Arc<dyn DayStore>,
    write_retries: u32,
}

impl DayService {
    pub fn new(store: Arc<dyn DayStore>) -> Self {
        Self {
            store,
            write_retries: DEFAULT_WRITE_RETRIES,
        }
    }

    /// Override the conflict-retry budget of mutating operations.
    pub fn with_write_retries(mut self, write_retries: u32) -> Self {
        self.write_retries = write_retries;
        self
    }

    /// Day for `(user_id, date)` with meals in display order.
    /// [`Error::NotFound`] when the user has nothing logged on that date.
    #[instrument(skip(self))]
    pub async fn get_day(&self, user_id: Uuid, date: &str) -> Result<DayRecord> {
        let stored = self
            .store
            .fetch_day(user_id, date)
            .await?
            .ok_or(Error::NotFound)?;
        let mut day = stored.day;
        order_meals(&mut day.meals);
        Ok(day)
    }

    /// All days of a user, oldest date first, meals in display order.
    #[instrument(skip(self))]
    pub async fn list_days(&self, user_id: Uuid) -> Result<Vec<DayRecord>> {
        let mut days = self.store.list_days(user_id).await?;
        for day in &mut days {
            order_meals(&mut day.meals);
        }
        Ok(days)
    }

    /// Create a day from scratch with an explicit set of meals.
    ///
    /// Missing ids are assigned and the day total is recomputed from the
    /// supplied meals rather than trusted. The day already existing is
    /// [`Error::Conflict`].
    #[instrument(skip(self, meals), fields(meal_count = meals.len()))]
    pub async fn create_day(
        &self,
        user_id: Uuid,
        date: &str,
        meals: Vec<Meal>,
    ) -> Result<DayRecord> {
        for meal in &meals {
            meal.validate()?;
        }

        let mut day = DayRecord::new(user_id, date);
        for meal in meals {
            day.add_meal(meal)?;
        }
        self.store.insert_day(&day).await?;
        info!(%user_id, date, day_id = %day.id, "day created");

        order_meals(&mut day.meals);
        Ok(day)
    }

    /// Log one meal on `(user_id, date)`, creating the day when nothing is
    /// stored there yet. Returns the updated day.
    #[instrument(skip(self, meal), fields(meal_name = %meal.name))]
    pub async fn log_meal(&self, user_id: Uuid, date: &str, meal: Meal) -> Result<DayRecord> {
        meal.validate()?;
        self.mutate_day(user_id, date, true, |day| {
            day.add_meal(meal.clone()).map(|_| ())
        })
        .await
    }

    /// Replace the meal stored under `meal_id`, adjusting the day total by
    /// the difference. Unknown day or meal id is [`Error::NotFound`].
    #[instrument(skip(self, meal))]
    pub async fn update_meal(
        &self,
        user_id: Uuid,
        date: &str,
        meal_id: Uuid,
        meal: Meal,
    ) -> Result<DayRecord> {
        meal.validate()?;
        self.mutate_day(user_id, date, false, |day| {
            day.replace_meal(meal_id, meal.clone())
        })
        .await
    }

    /// Remove the meal stored under `meal_id`, subtracting it from the day
    /// total. Unknown day or meal id is [`Error::NotFound`].
    #[instrument(skip(self))]
    pub async fn delete_meal(&self, user_id: Uuid, date: &str, meal_id: Uuid) -> Result<DayRecord> {
        self.mutate_day(user_id, date, false, |day| {
            day.remove_meal(meal_id).map(|_| ())
        })
        .await
    }

    /// Meals of the day in display order.
    #[instrument(skip(self))]
    pub async fn get_meals(&self, user_id: Uuid, date: &str) -> Result<Vec<Meal>> {
        let day = self.get_day(user_id, date).await?;
        Ok(day.meals)
    }

    /// Remove the whole day. Removing an absent day is not an error.
    #[instrument(skip(self))]
    pub async fn delete_day(&self, user_id: Uuid, date: &str) -> Result<()> {
        let removed = self.store.delete_day(user_id, date).await?;
        if removed {
            info!(%user_id, date, "day deleted");
        } else {
            debug!(%user_id, date, "day already absent");
        }
        Ok(())
    }

    /// Fetch, apply, compare-and-swap. While other writers win the race the
    /// loop re-fetches and re-applies, up to the configured budget.
    async fn mutate_day<F>(
        &self,
        user_id: Uuid,
        date: &str,
        create_missing: bool,
        mut apply: F,
    ) -> Result<DayRecord>
    where
        F: FnMut(&mut DayRecord) -> Result<()>,
    {
        for attempt in 0..=self.write_retries {
            if attempt > 0 {
                warn!(attempt, %user_id, date, "day write conflicted, retrying with fresh state");
            }

            let (mut day, version) = match self.store.fetch_day(user_id, date).await? {
                Some(stored) => (stored.day, Some(stored.version)),
                None if create_missing => (DayRecord::new(user_id, date), None),
                None => return Err(Error::NotFound),
            };

            apply(&mut day)?;

            let write = match version {
                Some(version) => self.store.update_day(&day, version).await,
                None => self.store.insert_day(&day).await,
            };
            match write {
                Ok(()) => {
                    if version.is_none() {
                        info!(%user_id, date, day_id = %day.id, "day created implicitly");
                    }
                    order_meals(&mut day.meals);
                    return Ok(day);
                }
                // another writer got in between: stale version, a day that
                // appeared under our insert, or one that vanished under our
                // update. Re-fetching settles all three.
                Err(Error::Conflict) | Err(Error::NotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        error!(%user_id, date, retries = self.write_retries, "day write kept conflicting, giving up");
        Err(Error::Conflict)
    }
}

#[cfg(test)]
mod service_tests {
    use super::*;
    use crate::days::memory::MemoryDayStore;
    use crate::days::model::Food;
    use crate::nutrition::{Nutrient, NutrientKey, NutritionSummary};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn service() -> DayService {
        DayService::new(Arc::new(MemoryDayStore::new()))
    }

    fn meal(name: &str, calories: Decimal) -> Meal {
        let mut nutrition = NutritionSummary::default();
        nutrition.calories = Some(Nutrient::new("Energy", "KCAL", calories));
        Meal {
            id: None,
            name: name.into(),
            foods: Vec::new(),
            nutrition,
        }
    }

    #[tokio::test]
    async fn log_meal_creates_the_day_implicitly() {
        let svc = service();
        let user = Uuid::new_v4();

        let day = svc
            .log_meal(user, "2020-06-01", meal("breakfast", dec!(300)))
            .await
            .expect("log ok");
        assert_eq!(day.user_id, user);
        assert_eq!(day.date, "2020-06-01");
        assert_eq!(day.meals.len(), 1);
        assert_eq!(day.nutrition.value(NutrientKey::Calories), dec!(300));

        let fetched = svc.get_day(user, "2020-06-01").await.expect("day exists");
        assert_eq!(fetched.nutrition.value(NutrientKey::Calories), dec!(300));
    }

    #[tokio::test]
    async fn log_meal_appends_to_an_existing_day() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.log_meal(user, "2020-06-01", meal("dinner", dec!(500)))
            .await
            .expect("log ok");

        let day = svc
            .log_meal(user, "2020-06-01", meal("breakfast", dec!(300)))
            .await
            .expect("log ok");
        assert_eq!(day.meals.len(), 2);
        assert_eq!(day.nutrition.value(NutrientKey::Calories), dec!(800));
        let names: Vec<&str> = day.meals.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["breakfast", "dinner"]);
    }

    #[tokio::test]
    async fn get_day_missing_is_not_found() {
        let svc = service();
        let err = svc.get_day(Uuid::new_v4(), "2020-06-01").await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn create_day_recomputes_the_total_and_rejects_duplicates() {
        let svc = service();
        let user = Uuid::new_v4();

        let day = svc
            .create_day(
                user,
                "2020-06-01",
                vec![meal("breakfast", dec!(300)), meal("dinner", dec!(500))],
            )
            .await
            .expect("create ok");
        assert_eq!(day.nutrition.value(NutrientKey::Calories), dec!(800));
        assert!(day.meals.iter().all(|m| m.id.is_some()));

        let err = svc.create_day(user, "2020-06-01", Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::Conflict));
    }

    #[tokio::test]
    async fn update_meal_adjusts_the_total_by_the_difference() {
        let svc = service();
        let user = Uuid::new_v4();
        let day = svc
            .log_meal(user, "2020-06-01", meal("lunch", dec!(650)))
            .await
            .expect("log ok");
        let id = day.meals[0].id.expect("meal id assigned");

        let day = svc
            .update_meal(user, "2020-06-01", id, meal("lunch", dec!(420)))
            .await
            .expect("update ok");
        assert_eq!(day.meals.len(), 1);
        assert_eq!(day.nutrition.value(NutrientKey::Calories), dec!(420));
    }

    #[tokio::test]
    async fn update_meal_with_unknown_id_is_not_found() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.log_meal(user, "2020-06-01", meal("lunch", dec!(650)))
            .await
            .expect("log ok");

        let err = svc
            .update_meal(user, "2020-06-01", Uuid::new_v4(), meal("lunch", dec!(420)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));

        // the day itself missing reports the same
        let err = svc
            .update_meal(user, "2020-06-02", Uuid::new_v4(), meal("lunch", dec!(420)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn delete_meal_subtracts_the_meal_from_the_total() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.log_meal(user, "2020-06-01", meal("breakfast", dec!(300)))
            .await
            .expect("log ok");
        let day = svc
            .log_meal(user, "2020-06-01", meal("dinner", dec!(500)))
            .await
            .expect("log ok");
        let dinner = day
            .meals
            .iter()
            .find(|m| m.name == "dinner")
            .and_then(|m| m.id)
            .expect("dinner id");

        let day = svc
            .delete_meal(user, "2020-06-01", dinner)
            .await
            .expect("delete ok");
        assert_eq!(day.meals.len(), 1);
        assert_eq!(day.nutrition.value(NutrientKey::Calories), dec!(300));
    }

    #[tokio::test]
    async fn get_meals_returns_display_order() {
        let svc = service();
        let user = Uuid::new_v4();
        for m in [
            meal("snack", dec!(120)),
            meal("dinner", dec!(500)),
            meal("breakfast", dec!(300)),
        ] {
            svc.log_meal(user, "2020-06-01", m).await.expect("log ok");
        }

        let meals = svc.get_meals(user, "2020-06-01").await.expect("meals ok");
        let names: Vec<&str> = meals.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["breakfast", "dinner", "snack"]);
    }

    #[tokio::test]
    async fn delete_day_is_idempotent() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.log_meal(user, "2020-06-01", meal("lunch", dec!(650)))
            .await
            .expect("log ok");

        svc.delete_day(user, "2020-06-01").await.expect("delete ok");
        svc.delete_day(user, "2020-06-01").await.expect("second delete ok");

        let err = svc.get_day(user, "2020-06-01").await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn log_meal_rejects_negative_servings() {
        let svc = service();
        let user = Uuid::new_v4();
        let mut bad = meal("lunch", dec!(650));
        bad.foods.push(Food {
            id: None,
            name: "rice".into(),
            group: "grains".into(),
            serving: -1,
            nutrition: NutritionSummary::default(),
            reference_nutrition: NutritionSummary::default(),
        });

        let err = svc.log_meal(user, "2020-06-01", bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // rejected input never reached the store
        let err = svc.get_day(user, "2020-06-01").await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn log_meal_rejects_totals_out_of_range() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.log_meal(user, "2020-06-01", meal("breakfast", Decimal::MAX))
            .await
            .expect("log ok");

        let err = svc
            .log_meal(user, "2020-06-01", meal("lunch", Decimal::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // the stored day still holds only the first meal
        let day = svc.get_day(user, "2020-06-01").await.expect("day exists");
        assert_eq!(day.meals.len(), 1);
        assert_eq!(day.nutrition.value(NutrientKey::Calories), Decimal::MAX);
    }

    #[tokio::test]
    async fn list_days_is_date_ordered() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.log_meal(user, "2020-06-02", meal("lunch", dec!(650)))
            .await
            .expect("log ok");
        svc.log_meal(user, "2020-06-01", meal("dinner", dec!(500)))
            .await
            .expect("log ok");

        let days = svc.list_days(user).await.expect("list ok");
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, ["2020-06-01", "2020-06-02"]);
    }
}
