use std::process;

use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::{check, error::AppError, sync},
    config,
    infra::telemetry,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    let command = cli_args
        .command
        .unwrap_or_else(|| config::Command::Sync(Box::default()));

    match command {
        config::Command::Sync(args) => sync::run_sync(&settings, &args.only).await,
        config::Command::Check(args) => check::run_check(&settings, &args.only).await,
    }
}
