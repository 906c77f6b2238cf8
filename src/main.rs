use actix_cors::Cors;
use actix_web::{get, middleware, post, web, App, HttpResponse, HttpServer};
use mongodb::Client;
use serde::Deserialize;
use std::io;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod balance;
mod config;
mod error;
mod exchange;
mod report;
mod schemas;
mod store;
mod summary;
mod validation;

use crate::{
    balance::compute_balances,
    config::Config,
    error::AppError,
    exchange::SettlementStrategy,
    report::SettlementReport,
    schemas::{Expense, Traveler},
    store::TripStore,
    summary::summarize,
};

#[derive(Clone, Copy, Debug)]
struct Settings {
    optimal_limit: usize,
}

#[derive(Deserialize)]
struct StrategyQuery {
    #[serde(default)]
    strategy: SettlementStrategy,
}

#[derive(Deserialize)]
struct LedgerJson {
    #[serde(default)]
    travelers: Vec<Traveler>,
    #[serde(default)]
    expenses: Vec<Expense>,
}

#[post("/settlements")]
async fn settle_ledger(
    settings: web::Data<Settings>,
    query: web::Query<StrategyQuery>,
    json: web::Json<LedgerJson>,
) -> Result<HttpResponse, AppError> {
    let ledger = json.into_inner();
    let report = SettlementReport::build(
        &ledger.travelers,
        &ledger.expenses,
        query.strategy,
        settings.optimal_limit,
    )?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/trips/{id}/balance")]
async fn get_balance(
    store: web::Data<TripStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let (trip, expenses) = store.trip_with_expenses(&id).await?;
    Ok(HttpResponse::Ok().json(compute_balances(&trip.travelers, &expenses)))
}

#[get("/trips/{id}/settlements")]
async fn get_settlements(
    store: web::Data<TripStore>,
    settings: web::Data<Settings>,
    id: web::Path<String>,
    query: web::Query<StrategyQuery>,
) -> Result<HttpResponse, AppError> {
    let (trip, expenses) = store.trip_with_expenses(&id).await?;
    let report = SettlementReport::build(
        &trip.travelers,
        &expenses,
        query.strategy,
        settings.optimal_limit,
    )?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/trips/{id}/summary")]
async fn get_summary(
    store: web::Data<TripStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let (trip, expenses) = store.trip_with_expenses(&id).await?;
    Ok(HttpResponse::Ok().json(summarize(trip.budget, &expenses)))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(settle_ledger)
        .service(get_balance)
        .service(get_settlements)
        .service(get_summary);
}

fn cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        return Cors::permissive();
    }
    origins.iter().fold(
        Cors::default()
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header(),
        |cors, origin| cors.allowed_origin(origin),
    )
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(io::Error::other)?;
    init_logging(config.log_json);

    info!(database = %config.database, "connecting to MongoDB");
    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .map_err(io::Error::other)?;
    let store = TripStore::new(&client, &config.database);
    let settings = Settings {
        optimal_limit: config.optimal_limit,
    };

    info!(bind = %config.bind, "starting server");
    let origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(settings))
            .configure(routes)
    })
    .bind(config.bind)?
    .run()
    .await
}
