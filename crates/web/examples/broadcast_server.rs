//! Pushes a tick to every connected websocket client once a second.

use std::time::Duration;

use nano_web::views::BroadcastWebSocketView;
use nano_web::{Route, Server, ServerError, ViewBinding};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let view = BroadcastWebSocketView::new();
    let broadcaster = view.broadcaster();

    let running = Server::builder()
        .address(([127, 0, 0, 1], 3000))
        .route(Route::exact("/ticks", ViewBinding::shared(view)))
        .build()?
        .start()
        .await?;

    let shutdown = running.shutdown_token();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        for tick in 0u64.. {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let delivered = broadcaster.send_text(format!("tick {tick}"));
                    debug!(tick, delivered, "broadcast");
                }
            }
        }
    });

    let _ = tokio::signal::ctrl_c().await;
    running.shutdown().await;
    Ok(())
}
