use keepwire::config::Config;
use keepwire::http::response::{Response, ResponseBuilder, StatusCode};
use keepwire::router::Router;
use keepwire::server::Server;

fn routes() -> Router {
    let mut router = Router::new();
    router
        .get("/", |_req| Response::ok("Hello from keepwire\n"))
        .get("/health", |_req| Response::ok("OK"))
        .post("/echo", |req| {
            let content_type = req
                .header_ignore_case("Content-Type")
                .unwrap_or("application/octet-stream")
                .to_string();
            ResponseBuilder::new(StatusCode::OK)
                .header("Content-Type", content_type)
                .body(req.body.clone())
                .build()
        });
    router
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let server = Server::new(cfg.server, routes());
    let shutdown = server.shutdown_handle();

    let mut accept_loop = tokio::spawn({
        let server = server.clone();
        async move { server.listen_connection().await }
    });

    tokio::select! {
        res = &mut accept_loop => {
            res??;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            shutdown.trigger();
            accept_loop.await??;
        }
    }

    Ok(())
}
