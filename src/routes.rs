use actix_web::web;
use crate::handlers;

/// API routes, mounted under "/api" in main.rs. End-user authentication is
/// handled in front of this service.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Checkout routes (/api/checkout/*)
    cfg.service(
        web::scope("/checkout")
            .service(handlers::checkout_handlers::create_plan_checkout)
            .service(handlers::checkout_handlers::create_credits_checkout)
    );

    // AI generation proxy (/api/ai-proxy)
    cfg.service(
        web::scope("/ai-proxy")
            .route("", web::post().to(handlers::ai_proxy_handlers::ai_proxy))
    );

    // Text-to-speech (/api/speech)
    cfg.service(
        web::scope("/speech")
            .route("", web::post().to(handlers::speech_handlers::synthesize_speech))
    );

    // Social publishing (/api/social/*)
    cfg.service(
        web::scope("/social")
            .service(handlers::social_handlers::post_image)
    );

    // Store catalog (/api/catalog/*)
    cfg.service(
        web::scope("/catalog")
            .service(handlers::catalog_handlers::list_woocommerce_products)
    );

    // Poster layout planning (/api/layout/*)
    cfg.service(
        web::scope("/layout")
            .service(handlers::layout_handlers::plan_poster_layout)
    );
}

/// Payment-provider callbacks. Mounted under "/webhooks"; each handler
/// authenticates its provider's shared secret itself.
pub fn configure_webhook_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::webhook_handlers::mercadopago_webhook)
        .service(handlers::webhook_handlers::asaas_webhook);
}
