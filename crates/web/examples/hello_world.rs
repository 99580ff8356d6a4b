use nano_http::protocol::{Request, Response};
use nano_web::{Route, Server, ServerError, ViewBinding, view_fn};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn hello(req: &Request) -> Response {
    Response::html(format!("hello {}", req.param("name").unwrap_or("world")))
}

fn greet(req: &Request) -> Response {
    let names = req.post_multi("name").map(|names| names.join(", ")).unwrap_or_default();
    Response::html(format!("<p>greetings to {names}</p>"))
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let server = Server::builder()
        .address(([127, 0, 0, 1], 3000))
        .route(Route::exact("/", ViewBinding::shared(view_fn(hello))))
        .route(Route::exact("/greet", ViewBinding::shared(view_fn(greet))))
        .build()?;

    info!("try: curl 'http://127.0.0.1:3000/?name=nano' or curl -d 'name=a&name=b' http://127.0.0.1:3000/greet");
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
