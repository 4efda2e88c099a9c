use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ServiceError;
use crate::models::{Courses, Dish, DishId, Key};
use crate::nutrition::NutritionLookup;

#[derive(Default)]
struct DishTable {
    last_id: DishId,
    by_id: BTreeMap<DishId, Dish>,
    by_name: HashMap<String, DishId>,
}

impl DishTable {
    fn id_of(&self, key: &Key) -> Option<DishId> {
        match key {
            Key::Id(id) => self.by_id.contains_key(id).then_some(*id),
            Key::Name(name) => self.by_name.get(name).copied(),
        }
    }
}

/// Owns every dish. Ids come from a counter that only moves forward, so an
/// id is never handed out twice even after the dish is deleted.
pub(crate) struct DishRegistry {
    table: RwLock<DishTable>,
    nutrition: Arc<dyn NutritionLookup>,
}

impl DishRegistry {
    pub(crate) fn new(nutrition: Arc<dyn NutritionLookup>) -> Self {
        DishRegistry {
            table: RwLock::new(DishTable::default()),
            nutrition,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DishTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DishTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn contains_name(&self, name: &str) -> bool {
        self.read().by_name.contains_key(name)
    }

    pub(crate) async fn create(&self, name: String) -> Result<DishId, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidBody("dish name must not be empty".to_string()));
        }
        if self.contains_name(&name) {
            return Err(ServiceError::DuplicateDish(name));
        }

        //no lock is held while the lookup runs
        let facts = match self.nutrition.lookup(&name).await? {
            Some(facts) => facts,
            None => return Err(ServiceError::UnknownFood(name)),
        };

        let mut table = self.write();
        //another request may have committed the same name during the lookup
        if table.by_name.contains_key(&name) {
            return Err(ServiceError::DuplicateDish(name));
        }
        table.last_id += 1;
        let id = table.last_id;
        table.by_name.insert(name.clone(), id);
        table.by_id.insert(id, Dish { id, name, facts });
        log::info!("created dish #{} `{}`", id, table.by_id[&id].name);
        Ok(id)
    }

    pub(crate) fn get_by_id(&self, id: DishId) -> Result<Dish, ServiceError> {
        self.read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(ServiceError::DishNotFound(Key::Id(id)))
    }

    pub(crate) fn get_by_name(&self, name: &str) -> Result<Dish, ServiceError> {
        let table = self.read();
        table
            .by_name
            .get(name)
            .and_then(|id| table.by_id.get(id))
            .cloned()
            .ok_or_else(|| ServiceError::DishNotFound(Key::Name(name.to_string())))
    }

    pub(crate) fn get(&self, key: &Key) -> Result<Dish, ServiceError> {
        match key {
            Key::Id(id) => self.get_by_id(*id),
            Key::Name(name) => self.get_by_name(name),
        }
    }

    pub(crate) fn list(&self) -> BTreeMap<DishId, Dish> {
        self.read().by_id.clone()
    }

    /// Resolves all courses of a meal under one read lock.
    pub(crate) fn resolve(&self, ids: &Courses<DishId>) -> Result<Courses<Dish>, ServiceError> {
        let table = self.read();
        ids.try_map(|id| {
            table
                .by_id
                .get(id)
                .cloned()
                .ok_or(ServiceError::UnknownDishReference(*id))
        })
    }

    pub(crate) fn delete(&self, key: &Key) -> Result<DishId, ServiceError> {
        let mut table = self.write();
        let id = table
            .id_of(key)
            .ok_or_else(|| ServiceError::DishNotFound(key.clone()))?;
        if let Some(dish) = table.by_id.remove(&id) {
            table.by_name.remove(&dish.name);
            log::info!("deleted dish #{} `{}`", id, dish.name);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutritionFacts;
    use crate::nutrition::{sample_foods, LookupError};
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> DishRegistry {
        DishRegistry::new(Arc::new(sample_foods()))
    }

    /// Answers every food, counting calls and yielding once so concurrent
    /// creations interleave around the lookup.
    #[derive(Default)]
    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NutritionLookup for CountingLookup {
        async fn lookup(&self, _food: &str) -> Result<Option<NutritionFacts>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            actix_web::rt::task::yield_now().await;
            Ok(Some(NutritionFacts {
                cal: 1.0,
                size: 1.0,
                sodium: 1.0,
                sugar: 1.0,
            }))
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl NutritionLookup for FailingLookup {
        async fn lookup(&self, _food: &str) -> Result<Option<NutritionFacts>, LookupError> {
            Err(LookupError::Rejected)
        }
    }

    #[actix_web::test]
    async fn ids_start_at_one_and_increase() {
        let dishes = registry();
        assert_eq!(dishes.create("orange".into()).await.unwrap(), 1);
        assert_eq!(dishes.create("spaghetti".into()).await.unwrap(), 2);
        assert_eq!(dishes.create("apple pie".into()).await.unwrap(), 3);
        assert_eq!(dishes.list().keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[actix_web::test]
    async fn stores_the_facts_reported_by_the_lookup() {
        let dishes = registry();
        let id = dishes.create("orange".into()).await.unwrap();
        let expected = sample_foods().lookup("orange").await.unwrap().unwrap();

        let by_id = dishes.get_by_id(id).unwrap();
        assert_eq!(by_id.facts, expected);
        assert_eq!(dishes.get_by_name("orange").unwrap(), by_id);
        assert_eq!(dishes.get(&Key::Id(id)).unwrap(), by_id);
    }

    #[actix_web::test]
    async fn duplicate_name_is_rejected_before_lookup() {
        let lookup = Arc::new(CountingLookup::default());
        let dishes = DishRegistry::new(lookup.clone());
        dishes.create("orange".into()).await.unwrap();

        let err = dishes.create("orange".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateDish(ref name) if name == "orange"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        // names are case sensitive
        assert_eq!(dishes.create("Orange".into()).await.unwrap(), 2);
    }

    #[actix_web::test]
    async fn unknown_food_and_blank_names_fail() {
        let dishes = registry();
        assert!(matches!(
            dishes.create("blah".into()).await,
            Err(ServiceError::UnknownFood(_))
        ));
        assert!(matches!(
            dishes.create("  ".into()).await,
            Err(ServiceError::InvalidBody(_))
        ));
        assert!(dishes.list().is_empty());
        // failed attempts do not consume ids
        assert_eq!(dishes.create("orange".into()).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn lookup_failures_propagate() {
        let dishes = DishRegistry::new(Arc::new(FailingLookup));
        assert!(matches!(
            dishes.create("orange".into()).await,
            Err(ServiceError::NutritionUnavailable(LookupError::Rejected))
        ));
    }

    #[actix_web::test]
    async fn concurrent_creates_of_one_name_commit_once() {
        let lookup = Arc::new(CountingLookup::default());
        let dishes = DishRegistry::new(lookup.clone());
        let results = join_all((0..8).map(|_| dishes.create("orange".into()))).await;

        let created: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(created, vec![&1]);
        // every request passed the first check, the commit re-check caught the rest
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 8);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ServiceError::DuplicateDish(_))));
        assert_eq!(dishes.list().len(), 1);
    }

    #[actix_web::test]
    async fn concurrent_creates_of_distinct_names_get_dense_ids() {
        let dishes = DishRegistry::new(Arc::new(CountingLookup::default()));
        let results = join_all((0..10).map(|i| dishes.create(format!("dish {}", i)))).await;

        let mut ids: Vec<DishId> = results.into_iter().map(Result::unwrap).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[actix_web::test]
    async fn resolve_reports_the_missing_course() {
        let dishes = registry();
        dishes.create("orange".into()).await.unwrap();
        dishes.create("spaghetti".into()).await.unwrap();

        let courses = dishes
            .resolve(&Courses { appetizer: 1, main: 2, dessert: 1 })
            .unwrap();
        assert_eq!(courses.main.name, "spaghetti");

        let err = dishes
            .resolve(&Courses { appetizer: 1, main: 7, dessert: 2 })
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnknownDishReference(7)));
    }

    #[actix_web::test]
    async fn delete_by_name_or_id_never_reuses_ids() {
        let dishes = registry();
        dishes.create("orange".into()).await.unwrap();
        dishes.create("spaghetti".into()).await.unwrap();

        assert_eq!(dishes.delete(&Key::Name("orange".into())).unwrap(), 1);
        assert_eq!(dishes.delete(&Key::Id(2)).unwrap(), 2);
        assert!(matches!(
            dishes.delete(&Key::Id(2)),
            Err(ServiceError::DishNotFound(Key::Id(2)))
        ));
        assert!(dishes.get_by_name("orange").is_err());

        assert_eq!(dishes.create("orange".into()).await.unwrap(), 3);
    }
}
