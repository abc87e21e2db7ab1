use std::io;

use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use taskdeck::{auth::AuthSettings, config::Config, db, routes};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config =
        Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let pool = db::setup(&config.database_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let settings = AuthSettings::from_config(&config);
    let allowed_origin = config.cors_allowed_origin.clone();

    log::info!("Starting taskdeck server at {}", config.server_url());

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(settings.clone()))
            .wrap(routes::cors(allowed_origin.as_deref()))
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
