//! Echoes every websocket message back to its sender.

use nano_web::views::{BidirectionalWebSocketView, WebSocket, session_fn};
use nano_web::{BoxError, Route, Server, ServerError, ViewBinding};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

async fn echo(mut socket: WebSocket) -> Result<(), BoxError> {
    while let Some(message) = socket.next_message().await? {
        info!(len = message.data().len(), "echo");
        socket.send(message).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let view = BidirectionalWebSocketView::new(session_fn(echo)).max_message_size(1024 * 1024);

    Server::builder()
        .address(([127, 0, 0, 1], 3000))
        .workers(16)
        .route(Route::exact("/echo", ViewBinding::shared(view)))
        .build()?
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
