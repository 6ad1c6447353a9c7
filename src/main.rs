use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use ofertaflash_server::clients::http_client::new_api_client;
use ofertaflash_server::clients::{
    synthesizer_from_config, AsaasClient, MercadoPagoClient, MetaGraphClient, OpenAiClient, SpeechSynthesizer,
    WooCommerceClient,
};
use ofertaflash_server::config::init_config;
use ofertaflash_server::db::connection::{create_pool, verify_connection};
use ofertaflash_server::handlers;
use ofertaflash_server::routes::{configure_routes, configure_webhook_routes};
use ofertaflash_server::security::WebhookAuthenticator;
use ofertaflash_server::services::billing::{
    CheckoutService, EntitlementReconciler, EntitlementStore, HttpPaymentGateway, PaymentGateway, PgEntitlementStore,
};
use ofertaflash_server::services::AiProxyService;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_settings = match init_config() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    let db_pool = match create_pool(&app_settings.database).await {
        Ok(pool) => {
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                log::error!("Cannot start server without a working database connection");
                std::process::exit(1);
            }
            log::info!("Database connection established successfully");
            pool
        }
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    let http_client = new_api_client(PROVIDER_TIMEOUT);

    // Billing
    let store: Arc<dyn EntitlementStore> = Arc::new(PgEntitlementStore::new(db_pool));
    let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(
        MercadoPagoClient::new(&app_settings.mercadopago, http_client.clone()),
        AsaasClient::new(&app_settings.asaas, http_client.clone()),
    ));
    let authenticator = web::Data::new(WebhookAuthenticator::new(app_settings.webhooks.clone()));
    let reconciler = web::Data::new(EntitlementReconciler::new(store.clone(), gateway.clone()));
    let checkout_service = web::Data::new(CheckoutService::new(store, gateway));

    // Provider proxies
    let ai_proxy_service = web::Data::new(AiProxyService::new(OpenAiClient::new(
        &app_settings.openai,
        http_client.clone(),
    )));
    let synthesizer: web::Data<dyn SpeechSynthesizer> =
        web::Data::from(synthesizer_from_config(&app_settings.speech, http_client.clone()));
    let meta_client = web::Data::new(MetaGraphClient::new(&app_settings.meta, http_client.clone()));
    let woocommerce_client = web::Data::new(WooCommerceClient::new(&app_settings.woocommerce, http_client));

    let host = &app_settings.server.host;
    let port = app_settings.server.port;
    log::info!("Starting server at http://{}:{}", host, port);
    let listener = TcpListener::bind(format!("{}:{}", host, port))?;

    let cors_origins = app_settings.server.cors_origins.clone();

    HttpServer::new(move || {
        let mut cors = Cors::default();
        if cors_origins.iter().any(|origin| origin == "*") {
            cors = cors.allow_any_origin();
        } else {
            for origin in &cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(authenticator.clone())
            .app_data(reconciler.clone())
            .app_data(checkout_service.clone())
            .app_data(ai_proxy_service.clone())
            .app_data(synthesizer.clone())
            .app_data(meta_client.clone())
            .app_data(woocommerce_client.clone())
            .service(web::resource("/health").route(web::get().to(handlers::health::health_check)))
            .service(web::scope("/api").configure(configure_routes))
            .service(web::scope("/webhooks").configure(configure_webhook_routes))
    })
    .listen(listener)?
    .run()
    .await
}
