use std::net::TcpListener;

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::cors::cors_layer;
use crate::routes::routes;
use crate::shutdown;

const MAX_CONCURRENT_REQUESTS: usize = 64;

pub async fn run(listener: TcpListener, ctx: AppContext) -> anyhow::Result<()> {
    let app = routes(ctx).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(tower::limit::ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
            .layer(cors_layer()),
    );

    listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(listener)?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    Ok(())
}
