//! Serves the directory given as first argument (default `.`) under `/static`.

use nano_web::views::DirectoryView;
use nano_web::{Route, Server, ServerConfig, ServerError, ViewBinding};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let root = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let config = ServerConfig { workers: 8, ..ServerConfig::default() };

    Server::builder()
        .config(config)
        .route(Route::prefix("/static", ViewBinding::shared(DirectoryView::new(root))))
        .build()?
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
