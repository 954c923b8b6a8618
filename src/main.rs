use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use recipe_box::config::{Config, Storage};
use recipe_box::configure;
use recipe_box::db;
use recipe_box::nutrition::NutritionTable;
use recipe_box::repository::{MemoryRepository, PgRepository, Repository};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn build_repository(config: &Config) -> Result<Arc<dyn Repository>, BoxError> {
    match config.storage {
        Storage::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL must be set")?;
            let pool = db::create_pool(database_url, config.db_pool_size)?;
            if config.run_migrations {
                db::run_migrations(&pool)?;
            }
            log::info!("Using PostgreSQL storage");
            Ok(Arc::new(PgRepository::new(pool)))
        }
        Storage::Memory => {
            let products = match &config.products_file {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)?;
                    NutritionTable::new(serde_json::from_str(&raw)?)
                }
                None => {
                    log::warn!("PRODUCTS_FILE not set, nutrition table is empty");
                    NutritionTable::default()
                }
            };
            log::info!(
                "Using in-memory storage with {} products",
                products.records().len()
            );
            Ok(Arc::new(MemoryRepository::new(products)))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().expect("Environment misconfigured");
    let repo = build_repository(&config).expect("Failed to initialise storage");

    let repo_data: web::Data<dyn Repository> = web::Data::from(repo);
    let config_data = web::Data::new(config.clone());

    log::info!(
        "Starting Recipe Box API server on {}:{}",
        config.host,
        config.port
    );

    HttpServer::new(move || {
        let cors = Cors::permissive(); // Configure this properly for production

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(repo_data.clone())
            .app_data(config_data.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
