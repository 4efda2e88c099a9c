use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

pub(crate) type DishId = u32;
pub(crate) type MealId = u32;

/// Nutrition facts of one serving, as reported by the lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct NutritionFacts {
    pub cal: f64,
    #[serde(default)]
    pub size: f64, //serving size in grams
    pub sodium: f64, //mg
    pub sugar: f64,  //g
}

impl Add for NutritionFacts {
    type Output = NutritionFacts;

    fn add(self, other: NutritionFacts) -> NutritionFacts {
        NutritionFacts {
            cal: self.cal + other.cal,
            size: self.size + other.size,
            sodium: self.sodium + other.sodium,
            sugar: self.sugar + other.sugar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Dish {
    pub id: DishId,
    pub name: String,
    #[serde(flatten)]
    pub facts: NutritionFacts,
}

/// A meal only points at its dishes; the totals are snapshotted when the
/// meal is composed since dishes never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Meal {
    pub id: MealId,
    pub name: String,
    pub appetizer: DishId,
    pub main: DishId,
    pub dessert: DishId,
    pub cal: f64,
    pub sodium: f64,
    pub sugar: f64,
}

impl Meal {
    pub(crate) fn compose(id: MealId, name: String, courses: &Courses<Dish>) -> Self {
        let total = courses
            .iter()
            .fold(NutritionFacts::default(), |acc, dish| acc + dish.facts);
        Meal {
            id,
            name,
            appetizer: courses.appetizer.id,
            main: courses.main.id,
            dessert: courses.dessert.id,
            cal: total.cal,
            sodium: total.sodium,
            sugar: total.sugar,
        }
    }
}

/// The three courses of a meal, either as dish ids or as resolved dishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Courses<T> {
    pub appetizer: T,
    pub main: T,
    pub dessert: T,
}

impl<T> Courses<T> {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        [&self.appetizer, &self.main, &self.dessert].into_iter()
    }

    pub(crate) fn try_map<U, E>(&self, mut f: impl FnMut(&T) -> Result<U, E>) -> Result<Courses<U>, E> {
        Ok(Courses {
            appetizer: f(&self.appetizer)?,
            main: f(&self.main)?,
            dessert: f(&self.dessert)?,
        })
    }
}

/// A path segment that addresses a record either by id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Key {
    Id(u32),
    Name(String),
}

impl Key {
    //ids win: a dish literally named "7" can only be reached through GET /dishes
    pub(crate) fn parse(segment: String) -> Self {
        match segment.parse::<u32>() {
            Ok(id) => Key::Id(id),
            Err(_) => Key::Name(segment),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Id(id) => write!(f, "#{}", id),
            Key::Name(name) => write!(f, "`{}`", name),
        }
    }
}
