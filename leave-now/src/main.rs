use std::io;
use std::process::ExitCode;

use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use leave_now::config::Config;
use leave_now::display::ConsoleDisplay;
use leave_now::feed::{FeedClient, FixtureFeed, TripSource};
use leave_now::poll::PollLoop;
use leave_now::render::{Renderer, run_render_loop};
use leave_now::state::SharedDisplayState;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shared = SharedDisplayState::default();

    // Render loop first, so the loading text is up while the first fetch runs
    let renderer = Renderer::new(ConsoleDisplay::new(io::stdout(), config.display_columns));
    let render = tokio::spawn(run_render_loop(renderer, shared.clone()));

    let poll = match (&config.fixture_dir, config.feed_config()) {
        (Some(dir), _) => match FixtureFeed::new(dir, config.target_stops()) {
            Ok(source) => {
                info!(dir = %dir.display(), snapshots = source.snapshot_count(), "replaying fixture feed");
                spawn_poll(source, &shared, &config)
            }
            Err(e) => {
                error!("Failed to load fixtures: {e}");
                render.abort();
                return ExitCode::FAILURE;
            }
        },
        (None, Some(feed_config)) => match FeedClient::new(feed_config) {
            Ok(source) => {
                info!(url = %config.feed_url, "polling live feed");
                spawn_poll(source, &shared, &config)
            }
            Err(e) => {
                error!("Failed to create feed client: {e}");
                render.abort();
                return ExitCode::FAILURE;
            }
        },
        (None, None) => {
            // Config::from_env guarantees one of the two
            error!("No feed source configured");
            render.abort();
            return ExitCode::FAILURE;
        }
    };

    supervise(poll, render).await
}

fn spawn_poll<S>(source: S, shared: &SharedDisplayState, config: &Config) -> JoinHandle<()>
where
    S: TripSource + Send + Sync + 'static,
{
    let poller = PollLoop::new(source, shared.clone(), config.poll_config());
    tokio::spawn(poller.run())
}

/// Wait for Ctrl-C, keeping the display alive if the poll loop dies.
async fn supervise(mut poll: JoinHandle<()>, mut render: JoinHandle<()>) -> ExitCode {
    let mut poll_alive = true;

    let code = loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {e}");
                }
                info!("shutting down");
                break ExitCode::SUCCESS;
            }
            result = &mut poll, if poll_alive => {
                // The render loop keeps showing the last published arrivals
                poll_alive = false;
                error!(?result, "poll loop stopped");
            }
            result = &mut render => {
                error!(?result, "render loop stopped");
                break ExitCode::FAILURE;
            }
        }
    };

    poll.abort();
    render.abort();

    code
}
