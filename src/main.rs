use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};

mod config;
mod dishes;
mod error;
mod meals;
mod models;
mod nutrition;
mod routes;

use crate::config::AppConfig;
use crate::dishes::DishRegistry;
use crate::meals::MealRegistry;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    let nutrition = nutrition::connect(&config.nutrition)?;

    //registries live for the whole process and are shared by every worker
    let dishes = Arc::new(DishRegistry::new(nutrition));
    let meals = Arc::new(MealRegistry::new(Arc::clone(&dishes)));

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(Arc::clone(&dishes)))
            .app_data(web::Data::from(Arc::clone(&meals)))
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
