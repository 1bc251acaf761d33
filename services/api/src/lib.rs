mod cli;
mod infra;
mod routes;
mod search;
mod server;

use ngo_nearby::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
