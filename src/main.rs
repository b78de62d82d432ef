use log::error;
use timetable_solver::server::{self, ServerConfig};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = server::run_server(ServerConfig::from_env()).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
