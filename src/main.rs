//! HTTPサーバー（Cloud Run）でのエントリポイント

use log::info;

mod sample_handler;

#[tokio::main]
async fn main() {
    // ロガーの初期化
    env_logger::init();

    info!("Starting hostbridge sample application");

    #[cfg(feature = "cloud_run")]
    {
        use std::env;
        use hostbridge::host::actix::{run_cloud_run_with_state, ActixState};

        let port = match env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse::<u16>() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error parsing port: {}", e);
                std::process::exit(1);
            }
        };
        let routes = match sample_handler::routes() {
            Ok(routes) => routes,
            Err(e) => {
                eprintln!("Invalid route table: {}", e);
                std::process::exit(1);
            }
        };
        let state = ActixState::new(sample_handler::SampleHandler::new()).with_routes(routes);
        let host = "0.0.0.0";
        info!("Running as HTTP server on port {}", port);
        if let Err(e) = run_cloud_run_with_state(state, host, port).await {
            eprintln!("Cloud Run error: {}", e);
            std::process::exit(1);
        }
    }

    #[cfg(not(feature = "cloud_run"))]
    {
        println!("Please enable the 'cloud_run' feature to run the HTTP server.");
        println!("Example: cargo run --features cloud_run");
        std::process::exit(1);
    }
}
