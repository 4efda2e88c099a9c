use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dishes::DishRegistry;
use crate::error::ServiceError;
use crate::models::{Courses, DishId, Key, Meal, MealId};

#[derive(Default)]
struct MealTable {
    last_id: MealId,
    by_id: BTreeMap<MealId, Meal>,
    by_name: HashMap<String, MealId>,
}

impl MealTable {
    fn id_of(&self, key: &Key) -> Option<MealId> {
        match key {
            Key::Id(id) => self.by_id.contains_key(id).then_some(*id),
            Key::Name(name) => self.by_name.get(name).copied(),
        }
    }
}

/// Owns every meal. Dishes are looked up through the dish registry; the
/// meal lock is always taken before the dish lock.
pub(crate) struct MealRegistry {
    table: RwLock<MealTable>,
    dishes: Arc<DishRegistry>,
}

impl MealRegistry {
    pub(crate) fn new(dishes: Arc<DishRegistry>) -> Self {
        MealRegistry {
            table: RwLock::new(MealTable::default()),
            dishes,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MealTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MealTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn create(&self, name: String, courses: Courses<DishId>) -> Result<MealId, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidBody("meal name must not be empty".to_string()));
        }

        let mut table = self.write();
        if table.by_name.contains_key(&name) {
            return Err(ServiceError::DuplicateMeal(name));
        }
        let dishes = self.dishes.resolve(&courses)?;

        table.last_id += 1;
        let id = table.last_id;
        table.by_name.insert(name.clone(), id);
        let meal = Meal::compose(id, name, &dishes);
        log::info!("created meal #{} `{}` ({} cal)", id, meal.name, meal.cal);
        table.by_id.insert(id, meal);
        Ok(id)
    }

    /// Renames a meal and/or swaps its courses, recomputing the totals.
    pub(crate) fn update(&self, id: MealId, name: String, courses: Courses<DishId>) -> Result<MealId, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidBody("meal name must not be empty".to_string()));
        }

        let mut table = self.write();
        let old_name = match table.by_id.get(&id) {
            Some(meal) => meal.name.clone(),
            None => return Err(ServiceError::MealNotFound(Key::Id(id))),
        };
        if old_name != name && table.by_name.contains_key(&name) {
            return Err(ServiceError::DuplicateMeal(name));
        }
        let dishes = self.dishes.resolve(&courses)?;

        table.by_name.remove(&old_name);
        table.by_name.insert(name.clone(), id);
        table.by_id.insert(id, Meal::compose(id, name, &dishes));
        log::info!("updated meal #{}", id);
        Ok(id)
    }

    pub(crate) fn get(&self, key: &Key) -> Result<Meal, ServiceError> {
        let table = self.read();
        table
            .id_of(key)
            .and_then(|id| table.by_id.get(&id))
            .cloned()
            .ok_or_else(|| ServiceError::MealNotFound(key.clone()))
    }

    pub(crate) fn list(&self) -> BTreeMap<MealId, Meal> {
        self.read().by_id.clone()
    }

    pub(crate) fn delete(&self, key: &Key) -> Result<MealId, ServiceError> {
        let mut table = self.write();
        let id = table
            .id_of(key)
            .ok_or_else(|| ServiceError::MealNotFound(key.clone()))?;
        if let Some(meal) = table.by_id.remove(&id) {
            table.by_name.remove(&meal.name);
            log::info!("deleted meal #{} `{}`", id, meal.name);
        }
        Ok(id)
    }
}
