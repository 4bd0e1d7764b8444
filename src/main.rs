#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod api;
mod catalog;
mod classify;
mod config;
mod db;
mod error;
mod import;
mod merge;
mod models;
mod normalize;
mod schema;
mod taxonomy;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;

use std::path::PathBuf;

use self::classify::Classifier;
use self::config::{Command, Config, ServeArgs};
use self::error::Result;

fn serve(database_url: &str, args: &ServeArgs) -> Result<()> {
    let pool = db::build_pool(database_url, args.pool_size)?;

    {
        let mut conn = pool.get()?;
        let taxonomy = db::prepare_catalog(&mut conn)?;
        info!("Catalog {} ready ({} categories)", database_url, taxonomy.len());
    }

    let listen_addr = args.listen_addr();

    actix_web::rt::System::new().block_on(async move {
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .wrap(Cors::permissive())
                .wrap(Logger::default())
                .configure(api::configure)
        })
        .bind(listen_addr)?;

        info!("Listening on {}", listen_addr);
        server.run().await
    })?;

    Ok(())
}

fn setup(database_url: &str) -> Result<()> {
    let mut conn = db::open(database_url)?;
    let taxonomy = catalog::seed_taxonomy(&mut conn)?;
    info!("Catalog {} set up with {} categories", database_url, taxonomy.len());
    Ok(())
}

fn import_files(database_url: &str, paths: &[PathBuf]) -> Result<()> {
    let mut conn = db::open(database_url)?;
    let taxonomy = catalog::seed_taxonomy(&mut conn)?;
    let classifier = Classifier::new(&taxonomy)?;

    let report = import::import_paths(&mut conn, &classifier, paths)?;
    report.log_summary("Import finished");

    for file in &report.failed_files {
        warn!("Not imported: {}", file.display());
    }

    Ok(())
}

fn reclassify(database_url: &str, reclassify_all: bool) -> Result<()> {
    let mut conn = db::open(database_url)?;
    let taxonomy = catalog::seed_taxonomy(&mut conn)?;
    let classifier = Classifier::new(&taxonomy)?;

    let changed = catalog::assign_categories(&mut conn, &classifier, reclassify_all)?;
    info!("Assigned categories to {} beers", changed);
    Ok(())
}

fn run(config: Config) -> Result<()> {
    let database_url = config.database_url.as_str();

    match config.command {
        Command::Serve(args) => serve(database_url, &args),
        Command::Setup => setup(database_url),
        Command::Import { paths } => import_files(database_url, &paths),
        Command::Classify { all } => reclassify(database_url, all),
    }
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    if let Err(e) = run(config) {
        error!("{}", e);
        std::process::exit(1);
    }
}
