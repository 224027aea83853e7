#[macro_use]
extern crate rocket;

mod api;
mod cache;
mod config;
mod fetch;
mod images;
mod models;
mod resolver;
mod stars;

use std::env;
use std::path::Path;

use dotenv::dotenv;
use env_logger::Env;
use log::info;
use rocket::{
    figment::{
        providers::{Format, Toml},
        Figment, Profile,
    },
    Config,
};

use cache::{ColorCache, DerivativeStore};
use config::AppConfig;
use fetch::HttpFetcher;
use images::Pipeline;
use stars::StarAggregator;

#[launch]
async fn rocket() -> _ {
    dotenv().ok();

    // Load config
    let mut figment = Figment::from(Config::default()).merge(Toml::file("App.toml").nested());

    // Deploy-time overrides
    if let Ok(prefix) = env::var("URL_PREFIX") {
        figment = figment.merge(("url_prefix", prefix));
    }
    if let Ok(dir) = env::var("IMAGE_DIR") {
        figment = figment.merge(("image_dir", dir));
    }
    if let Ok(api_url) = env::var("STAR_API_URL") {
        figment = figment.merge(("star_api_url", api_url));
    }

    figment = figment.select(Profile::from_env_or("APP_PROFILE", "default"));

    let config = figment.extract::<AppConfig>().unwrap();

    // Initialize logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    info!("Configuration loaded successfully");
    info!("Serving origin prefix {}", config.url_prefix);

    if let Err(e) = std::fs::create_dir_all(&config.image_dir) {
        log::warn!("Could not create image directory {}: {}", config.image_dir, e);
    }

    let store = DerivativeStore::new(&config.image_dir);
    let memo = ColorCache::new();
    let mask_path = Path::new(&config.image_dir).join("mask.png");

    let pipeline = Pipeline::new(
        HttpFetcher::new(config.timeout, &config.user_agent),
        store,
        memo,
        config.url_prefix.clone(),
        mask_path,
    );
    info!("Derivative pipeline initialized, store at {}", config.image_dir);

    let aggregator = StarAggregator::new(
        HttpFetcher::new(config.timeout, &config.user_agent),
        config.star_api_url.clone(),
        config.url_prefix.clone(),
    );

    info!(
        "Starting blog image proxy on {}:{}",
        config.address, config.port
    );

    // Build Rocket instance
    rocket::custom(figment)
        .manage(pipeline)
        .manage(aggregator)
        .mount(
            "/fcgi",
            routes![
                api::blog::blog_image,
                api::blog::blog_image_blur,
                api::blog::color_average,
                api::blog::star,
            ],
        )
}
