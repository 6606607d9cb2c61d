use std::{env, io, path::PathBuf, process::ExitCode};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use device_agent::{load_config, spool, AgentConfig, GatewayClient, Measurement};

const USAGE: &str = "usage: device-agent [measurement <type> <value> | image <path>]";

enum Command {
    Service,
    Measurement { kind: String, value: String },
    Image(PathBuf),
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [] => Some(Command::Service),
        [cmd, kind, value] if cmd == "measurement" => Some(Command::Measurement {
            kind: kind.clone(),
            value: value.clone(),
        }),
        [cmd, path] if cmd == "image" => Some(Command::Image(PathBuf::from(path))),
        _ => None,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    // Config comes from file and env; env wins.
    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load config");
            return ExitCode::FAILURE;
        }
    };
    let client = match GatewayClient::new(&config) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "failed to build http client");
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        Command::Service => {
            run_service(&config, &client).await;
            Ok(())
        }
        Command::Measurement { kind, value } => {
            client.send_measurement(&Measurement::parse(&kind, &value)).await
        }
        Command::Image(path) => client.upload_image(&path).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "request failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_service(config: &AgentConfig, client: &GatewayClient) {
    tracing::info!(
        gateway = %config.gateway_url,
        device_id = %config.device_id,
        spool = %config.spool_dir.display(),
        "device agent started"
    );
    if let Err(err) = tokio::fs::create_dir_all(&config.spool_dir).await {
        tracing::error!(error = %err, "spool directory unavailable");
        return;
    }

    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                match spool::drain(client, &config.spool_dir).await {
                    Ok(report) if report == spool::DrainReport::default() => {}
                    Ok(report) => tracing::info!(
                        sent = report.sent,
                        failed = report.failed,
                        quarantined = report.quarantined,
                        "spool drained"
                    ),
                    Err(err) => tracing::warn!(error = %err, "spool scan failed"),
                }
            }
        }
    }
}
