mod cli;
mod commands;
mod infra;

use multirater::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
