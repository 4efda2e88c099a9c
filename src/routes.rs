use actix_web::error::{JsonPayloadError, PathError};
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::dishes::DishRegistry;
use crate::error::ServiceError;
use crate::meals::MealRegistry;
use crate::models::{Courses, DishId, Key, MealId};

#[derive(Debug, Deserialize)]
struct CreateDishRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MealRequest {
    name: String,
    appetizer: DishId,
    main: DishId,
    dessert: DishId,
}

impl MealRequest {
    fn into_parts(self) -> (String, Courses<DishId>) {
        let courses = Courses {
            appetizer: self.appetizer,
            main: self.main,
            dessert: self.dessert,
        };
        (self.name, courses)
    }
}

//bodies that fail to extract still answer with an integer code
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match err {
        JsonPayloadError::ContentType => ServiceError::UnsupportedMediaType,
        other => ServiceError::InvalidBody(other.to_string()),
    }
    .into()
}

//only `PUT /meals/{id}` has a typed segment, anything unparsable there is no meal
fn path_error(_err: PathError, req: &HttpRequest) -> actix_web::Error {
    let segment = req.match_info().query("id").to_string();
    ServiceError::MealNotFound(Key::Name(segment)).into()
}

#[get("/")]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json("OK")
}

#[get("/dishes")]
async fn get_dishes(dishes: web::Data<DishRegistry>) -> HttpResponse {
    HttpResponse::Ok().json(dishes.list())
}

#[post("/dishes")]
async fn create_dish(
    dishes: web::Data<DishRegistry>,
    body: web::Json<CreateDishRequest>,
) -> Result<HttpResponse, ServiceError> {
    let id = dishes.create(body.into_inner().name).await?;
    Ok(HttpResponse::Created().json(id))
}

#[delete("/dishes")]
async fn delete_dishes() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json("Not implemented")
}

#[get("/dishes/{key}")]
async fn get_dish(
    key: web::Path<String>,
    dishes: web::Data<DishRegistry>,
) -> Result<HttpResponse, ServiceError> {
    let dish = dishes.get(&Key::parse(key.into_inner()))?;
    Ok(HttpResponse::Ok().json(dish))
}

#[delete("/dishes/{key}")]
async fn delete_dish(
    key: web::Path<String>,
    dishes: web::Data<DishRegistry>,
) -> Result<HttpResponse, ServiceError> {
    let id = dishes.delete(&Key::parse(key.into_inner()))?;
    Ok(HttpResponse::Ok().json(id))
}

#[get("/meals")]
async fn get_meals(meals: web::Data<MealRegistry>) -> HttpResponse {
    HttpResponse::Ok().json(meals.list())
}

#[post("/meals")]
async fn create_meal(
    meals: web::Data<MealRegistry>,
    body: web::Json<MealRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (name, courses) = body.into_inner().into_parts();
    let id = meals.create(name, courses)?;
    Ok(HttpResponse::Created().json(id))
}

#[delete("/meals")]
async fn delete_meals() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json("Not implemented")
}

#[get("/meals/{key}")]
async fn get_meal(
    key: web::Path<String>,
    meals: web::Data<MealRegistry>,
) -> Result<HttpResponse, ServiceError> {
    let meal = meals.get(&Key::parse(key.into_inner()))?;
    Ok(HttpResponse::Ok().json(meal))
}

#[put("/meals/{id}")]
async fn update_meal(
    id: web::Path<MealId>,
    meals: web::Data<MealRegistry>,
    body: web::Json<MealRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (name, courses) = body.into_inner().into_parts();
    let id = meals.update(id.into_inner(), name, courses)?;
    Ok(HttpResponse::Ok().json(id))
}

#[delete("/meals/{key}")]
async fn delete_meal(
    key: web::Path<String>,
    meals: web::Data<MealRegistry>,
) -> Result<HttpResponse, ServiceError> {
    let id = meals.delete(&Key::parse(key.into_inner()))?;
    Ok(HttpResponse::Ok().json(id))
}

/// Registers every endpoint; registries are expected as `web::Data` on the app.
pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(health_check)
        .service(get_dishes)
        .service(create_dish)
        .service(delete_dishes)
        .service(get_dish)
        .service(delete_dish)
        .service(get_meals)
        .service(create_meal)
        .service(delete_meals)
        .service(get_meal)
        .service(update_meal)
        .service(delete_meal);
}
