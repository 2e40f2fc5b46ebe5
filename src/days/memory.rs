//! In-memory [`DayStore`] with the same conflict semantics as Postgres.
//!
//! Backs the service tests and works as a storage backend for embedding
//! without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::model::DayRecord;
use super::repo::{DayStore, StoredDay};

type DayKey = (Uuid, String);

#[derive(Default)]
pub struct MemoryDayStore {
    days: Mutex<HashMap<DayKey, (DayRecord, i64)>>,
}

impl MemoryDayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DayStore for MemoryDayStore {
    async fn fetch_day(&self, user_id: Uuid, date: &str) -> Result<Option<StoredDay>> {
        let days = self.days.lock().expect("day map mutex poisoned");
        Ok(days
            .get(&(user_id, date.to_owned()))
            .map(|(day, version)| StoredDay {
                day: day.clone(),
                version: *version,
            }))
    }

    async fn insert_day(&self, day: &DayRecord) -> Result<()> {
        let mut days = self.days.lock().expect("day map mutex poisoned");
        let key = (day.user_id, day.date.clone());
        if days.contains_key(&key) {
            return Err(Error::Conflict);
        }
        days.insert(key, (day.clone(), 1));
        Ok(())
    }

    async fn update_day(&self, day: &DayRecord, expected_version: i64) -> Result<()> {
        let mut days = self.days.lock().expect("day map mutex poisoned");
        match days.get_mut(&(day.user_id, day.date.clone())) {
            None => Err(Error::NotFound),
            Some((_, version)) if *version != expected_version => Err(Error::Conflict),
            Some(slot) => {
                *slot = (day.clone(), expected_version + 1);
                Ok(())
            }
        }
    }

    async fn delete_day(&self, user_id: Uuid, date: &str) -> Result<bool> {
        let mut days = self.days.lock().expect("day map mutex poisoned");
        Ok(days.remove(&(user_id, date.to_owned())).is_some())
    }

    async fn list_days(&self, user_id: Uuid) -> Result<Vec<DayRecord>> {
        let days = self.days.lock().expect("day map mutex poisoned");
        let mut out: Vec<DayRecord> = days
            .values()
            .filter(|(day, _)| day.user_id == user_id)
            .map(|(day, _)| day.clone())
            .collect();
        out.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(out)
    }
}
