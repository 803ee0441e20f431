//! CGI環境でのエントリポイント

use env_logger::Env;
use log::{error, info};
use hostbridge::host::cgi;

mod sample_handler;

#[tokio::main]
async fn main() {
    // CGIでは標準出力がHTTPレスポンスとなるため、ログは標準エラー出力に出力する
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("Starting hostbridge CGI application");

    let routes = match sample_handler::routes() {
        Ok(routes) => routes,
        Err(err) => {
            error!("Invalid route table: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = cgi::run_cgi_with_routes(sample_handler::SampleHandler::new(), routes).await {
        error!("Error running CGI application: {:?}", err);
        std::process::exit(1);
    }
}
