use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use the_watcher::cache::{CachedEntityClient, RedisClient};
use the_watcher::clients::{
    AiIntegration, AiIntegrationClient, Collection, EntityClient, InMemoryEntityClient,
    RestEntityClient,
};
use the_watcher::config::{EntityBackend, EnvironmentConfig};
use the_watcher::middleware::cors_layer;
use the_watcher::routes::create_router;
use the_watcher::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    info!("🏭 The Watcher - gestão da oficina");
    info!("================================================");
    info!("🌍 Ambiente: {}", config.environment);
    if config.is_development() {
        warn!("🧪 Modo desenvolvimento: segredo JWT e CORS permissivos por omissão");
    }

    let entities = build_entity_client(&config).await?;
    let ai: Arc<dyn AiIntegration> = Arc::new(AiIntegrationClient::new(&config.backend)?);

    let addr: SocketAddr = config.server_url().parse()?;
    let cors_origins = config.cors_origins.clone();
    let max_concurrent = config.max_concurrent_requests;
    let poll_interval = Duration::from_secs(config.notification_poll_secs);

    let state = AppState::new(config, Arc::clone(&entities), ai);
    state.notifications.spawn(&entities, poll_interval);

    let app = create_router(state)
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&cors_origins))
        .layer(TraceLayer::new_for_http());

    info!("🌐 Servidor a iniciar em http://{}", addr);
    info!("🔍 Endpoints disponíveis:");
    info!("   GET  /health");
    info!("   POST /api/auth/profile | GET /api/auth/me | POST /api/auth/logout");
    info!("   /api/machines, /api/service-orders, /api/part-requests");
    info!("   /api/notifications (SSE em /stream), /api/extraction");
    info!("   /api/backup, /api/reports, /api/users (admin)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Erro do servidor: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Cliente de entidades según `ENTITY_BACKEND`, con caché Redis si hay URL
async fn build_entity_client(config: &EnvironmentConfig) -> Result<Arc<dyn EntityClient>> {
    match config.backend.entity_backend {
        EntityBackend::Memory => {
            warn!("🧪 Backend em memória: os dados perdem-se ao reiniciar");
            Ok(Arc::new(InMemoryEntityClient::new()))
        }
        EntityBackend::Rest => {
            let rest = Arc::new(RestEntityClient::new(&config.backend)?);
            info!("🔗 Backend REST: {}", config.backend.app_url());
            rest.start_change_feed(Collection::ALL.to_vec(), config.backend.change_feed_interval);

            let inner: Arc<dyn EntityClient> = rest;
            let Some(redis_url) = config.cache.redis_url.as_deref() else {
                return Ok(inner);
            };
            match RedisClient::new(config.cache.clone(), redis_url).await {
                Ok(redis) => Ok(Arc::new(CachedEntityClient::new(inner, redis))),
                Err(e) => {
                    warn!("⚠️ Redis indisponível, a continuar sem cache: {}", e);
                    Ok(inner)
                }
            }
        }
    }
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Não foi possível instalar o handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ Não foi possível instalar o handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Sinal Ctrl+C recebido, a desligar o servidor...");
        },
        _ = terminate => {
            info!("🛑 Sinal de terminação recebido, a desligar o servidor...");
        },
    }
}
