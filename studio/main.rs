/// ferrite-vision Studio
///
/// Browser front end for the training experiments: pick an example, tune its
/// hyperparameters, start and stop training and watch the batch and epoch
/// charts update live over Server-Sent Events.
///
/// Run with:
///   cargo run --bin studio --release -- [--config lab.json] [--bind ADDR]
/// Then open http://127.0.0.1:7878
mod handlers;
mod render;
mod routes;
mod state;
mod util;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tiny_http::Server;

use ferrite_vision::LabConfig;

use state::StudioState;

#[derive(Parser, Debug)]
#[command(name = "studio", about = "Live training charts for ferrite-vision experiments")]
struct Args {
    /// JSON file with data_dir / artifacts_dir / bind / seed
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut lab = LabConfig::load_or_default(args.config.as_deref())
        .context("failed to read configuration")?;
    if let Some(bind) = args.bind {
        lab.bind = bind;
    }
    if let Some(dir) = args.data_dir {
        lab.data_dir = dir;
    }

    std::fs::create_dir_all(&lab.artifacts_dir)
        .with_context(|| format!("cannot create '{}'", lab.artifacts_dir.display()))?;

    let server = Server::http(lab.bind.as_str())
        .map_err(|e| anyhow!("failed to bind {}: {}", lab.bind, e))?;

    log::info!("ferrite-vision studio listening on http://{}", lab.bind);
    log::info!("datasets from '{}', models to '{}'", lab.data_dir.display(), lab.artifacts_dir.display());

    let shared_state = Arc::new(Mutex::new(StudioState::new(lab)));

    // Each request is dispatched on its own thread so the SSE handler
    // (which blocks for the entire training duration) does not stall
    // regular page loads and form submissions.
    for request in server.incoming_requests() {
        let state_clone = shared_state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state_clone);
        });
    }
    Ok(())
}
