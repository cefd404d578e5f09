use std::{path::PathBuf, sync::Arc};

use attenuator::{
    AttenuatorController, LinearityRange,
    config::{ConfigOptions, create_default_config, init_config_with_options},
    console::{Console, spawn_stdin_reader},
    http, logging,
};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;

#[derive(Parser, Debug)]
#[command(name = "attenuator")]
#[command(about = "Motorized optical attenuator control")]
struct Args {
    /// Configuration file (defaults to $CONFIG_PATH or attenuator.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port: a number selects COM<N> / /dev/ttyACM<N>, anything else is a path
    #[arg(long)]
    port: Option<String>,

    /// Accept any attenuation in [-100, 100] instead of the calibrated linearity range
    #[arg(long)]
    full_range: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Interactive prompt (default)
    Console,
    /// HTTP interface
    Serve {
        #[arg(long)]
        bind: Option<String>,

        #[arg(long)]
        http_port: Option<u16>,

        /// Also run the interactive prompt; `quit` stops the server
        #[arg(long)]
        console: bool,
    },
}

fn should_create_config() -> bool {
    std::env::var("CREATE_CONFIG")
        .map(|val| val == "1" || val.to_lowercase() == "true")
        .unwrap_or(false)
}

async fn run_console(controller: Arc<AttenuatorController>) -> anyhow::Result<()> {
    let mut console = Console::new(controller, std::io::stdout());
    console.run(spawn_stdin_reader()).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mode = args.mode.unwrap_or(Mode::Console);
    logging::init(match mode {
        Mode::Console => logging::CONSOLE_DEFAULT_FILTER,
        Mode::Serve { .. } => logging::SERVER_DEFAULT_FILTER,
    });

    if should_create_config() {
        create_default_config(args.config.as_ref())?;
    }

    let options = match &args.config {
        Some(path) => ConfigOptions::with_path(path),
        None => ConfigOptions::default(),
    };

    let (_config_manager, config) = init_config_with_options(options).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Run with CREATE_CONFIG=1 to create a default configuration file.");
        e
    })?;

    let linearity_range = if args.full_range {
        LinearityRange::full()
    } else {
        config.linearity_range
    };

    if matches!(mode, Mode::Console) {
        println!("Attenuator control");
    }

    let controller = Arc::new(AttenuatorController::connect(
        &config,
        args.port.as_deref(),
        linearity_range,
    )?);

    match &args.port {
        Some(port) => println!("Controller connected on port {port}"),
        None => println!("Controller connected"),
    }

    match mode {
        Mode::Console => run_console(Arc::clone(&controller)).await?,
        Mode::Serve {
            bind,
            http_port,
            console,
        } => {
            let bind = bind.unwrap_or_else(|| config.http.bind_address.clone());
            let port = http_port.unwrap_or(config.http.port);

            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let console_task = console.then(|| {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    let result = run_console(controller).await;
                    let _ = stop_tx.send(());
                    result
                })
            });

            let shutdown = async move {
                let console_done = async {
                    if console {
                        let _ = stop_rx.await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                };

                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = console_done => {}
                }
            };

            http::serve(Arc::clone(&controller), &bind, port, shutdown).await?;

            if let Some(task) = console_task {
                task.abort();
                let _ = task.await;
            }
        }
    }

    if let Ok(controller) = Arc::try_unwrap(controller) {
        controller.close().await?;
    }

    Ok(())
}
