use anyhow::{anyhow, Context};
use chan_overlay::api::{ChanApiClient, OverlayQuery};
use chan_overlay::config::ClientConfig;
use chan_overlay::events::{MarkerManager, MarkerSpec, MarkerSurface};
use chan_overlay::overlay::{
    render, ChanDrawingSettings, GeometryBuilder, LinearViewport, OverlayResponse, VisibleRange,
};

const VIEWPORT_WIDTH: f64 = 1600.0;
const VIEWPORT_HEIGHT: f64 = 900.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first to determine mode
    let args: Vec<String> = std::env::args().collect();
    let opts = parse_args(&args);

    // Logs go to stderr; RUST_LOG overrides the INFO default
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut config = ClientConfig::from_env().map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    if let Some(symbol) = &opts.symbol {
        config.symbol = symbol.to_uppercase();
    }
    if let Some(tf) = &opts.tf {
        config.tf = tf.clone();
    }

    tracing::info!(
        "Starting chan-overlay in {} mode for {} {}",
        opts.mode,
        config.symbol,
        config.tf
    );

    match opts.mode.as_str() {
        "overlay" => run_overlay(&config).await?,
        "live" => run_live(&config).await?,
        "replay" => run_replay(&config, opts.speed).await?,
        _ => {
            eprintln!("Invalid mode: {}", opts.mode);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

struct Options {
    mode: String,
    symbol: Option<String>,
    tf: Option<String>,
    speed: f64,
}

/// Parse command-line arguments
fn parse_args(args: &[String]) -> Options {
    let mut opts = Options {
        mode: "overlay".to_string(),
        symbol: None,
        tf: None,
        speed: 1.0,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" => {
                if i + 1 < args.len() {
                    opts.mode = args[i + 1].clone();
                    i += 1;
                }
            }
            "--overlay" => opts.mode = "overlay".to_string(),
            "--live" => opts.mode = "live".to_string(),
            "--replay" => opts.mode = "replay".to_string(),
            "--symbol" => {
                if i + 1 < args.len() {
                    opts.symbol = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--tf" => {
                if i + 1 < args.len() {
                    opts.tf = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--speed" => {
                if i + 1 < args.len() {
                    opts.speed = args[i + 1].parse().unwrap_or(1.0);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    opts
}

/// Print usage information
fn print_usage() {
    println!("chan-overlay - structural overlay and live event client for the analysis backend");
    println!();
    println!("USAGE:");
    println!("    chan-overlay [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --mode <MODE>       overlay, live, or replay (default: overlay)");
    println!("    --overlay           Fetch the overlay once and report diagnostics");
    println!("    --live              Follow the live event feed until Ctrl+C");
    println!("    --replay            Start a replay session and play it");
    println!("    --symbol <SYMBOL>   Symbol (default: CHAN_SYMBOL or BZ)");
    println!("    --tf <TF>           Display timeframe (default: CHAN_TF or 1m)");
    println!("    --speed <X>         Replay speed (default: 1)");
    println!("    --help, -h          Print this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    CHAN_API_BASE                   REST base URL (default: http://localhost:8766)");
    println!("    CHAN_WS_URL                     Feed URL (default: ws://localhost:8766/ws/feed)");
    println!("    CHAN_RECONNECT_DELAY_MS         Feed reconnect delay (default: 3000)");
    println!("    CHAN_OVERLAY_POLL_SECS          Overlay refresh period (default: 60)");
    println!("    CHAN_OVERLAY_INITIAL_DELAY_MS   First overlay load delay (default: 800)");
    println!("    CHAN_HTTP_TIMEOUT_SECS          REST timeout (default: 10)");
    println!("    CHAN_WS_CONNECT_TIMEOUT_SECS    Feed handshake timeout (default: 10)");
    println!("    RUST_LOG                        Logging level (default: info)");
    println!();
    println!("EXAMPLES:");
    println!("    chan-overlay --overlay --symbol CL --tf 5m");
    println!("    chan-overlay --mode replay --speed 4");
}

/// Marker sink that reports to the log instead of a chart
struct LoggedSeries;

impl MarkerSurface for LoggedSeries {
    fn set_markers(&mut self, markers: &[MarkerSpec]) {
        if let Some(last) = markers.last() {
            tracing::info!(
                total = markers.len(),
                text = last.text,
                at = %format_ts(last.time),
                "Markers updated"
            );
        }
    }
}

fn format_ts(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Visible range spanning every primitive of the overlay
fn full_range(overlay: &OverlayResponse) -> Option<VisibleRange> {
    let times = overlay
        .strokes
        .iter()
        .flat_map(|s| [s.t0, s.t1])
        .chain(overlay.segments.iter().flat_map(|s| [s.t0, s.t1]));
    let (time_from, time_to) = times.fold(None, |acc: Option<(i64, i64)>, t| match acc {
        None => Some((t, t)),
        Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
    })?;

    let prices = overlay.strokes.iter().flat_map(|s| [s.p0, s.p1]);
    let (price_low, price_high) = prices.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p), hi.max(p))
    });
    if !price_low.is_finite() || !price_high.is_finite() {
        return None;
    }

    Some(VisibleRange {
        time_from,
        time_to,
        price_low,
        price_high,
    })
}

/// Fetch the overlay once, build geometry over its full range and report
async fn run_overlay(config: &ClientConfig) -> anyhow::Result<()> {
    let client = ChanApiClient::new(config)?;
    let query = OverlayQuery::for_symbol(&config.symbol, &config.tf);
    let overlay = client
        .get_overlay(&query)
        .await
        .context("Overlay query failed")?;

    if !overlay.is_supported_schema() {
        tracing::warn!("Unsupported overlay schema: {}", overlay.schema_version);
        return Ok(());
    }

    let Some(range) = full_range(&overlay) else {
        tracing::info!("Overlay is empty");
        return Ok(());
    };
    tracing::info!(
        "Overlay {} strokes, {} segments, {} levels from {} to {}",
        overlay.strokes.len(),
        overlay.segments.len(),
        overlay.levels.len(),
        format_ts(range.time_from),
        format_ts(range.time_to)
    );

    let viewport = LinearViewport::new(range, VIEWPORT_WIDTH, VIEWPORT_HEIGHT);
    let geometry = GeometryBuilder::new().build(&overlay, &viewport);
    let ops = render(&geometry, &ChanDrawingSettings::default());
    tracing::info!("Rendered {} paint operations", ops.len());

    if let Some(lstar) = &overlay.lstar {
        tracing::info!(
            "Decisive anchor: level {} center {} regime {} alive={}",
            lstar.level,
            lstar.center_id,
            lstar.regime,
            lstar.is_alive
        );
    }

    let diag = &geometry.diagnostics;
    if diag.has_findings() {
        tracing::warn!("Segment consistency findings:\n{}", serde_json::to_string_pretty(diag)?);
    } else {
        tracing::info!("Segments passed all consistency checks");
    }
    Ok(())
}

#[cfg(feature = "websocket")]
async fn run_live(config: &ClientConfig) -> anyhow::Result<()> {
    use chan_overlay::feed::{FeedStore, LiveFeedController, StoreUpdate, WebSocketConnector, WsCommand};
    use tokio::sync::broadcast::error::RecvError;

    let store = FeedStore::new();
    let mut updates = store.subscribe();
    let feed = LiveFeedController::new(WebSocketConnector::from_config(config), store, config);
    let mut markers = MarkerManager::new();
    markers.attach(LoggedSeries);
    feed.enable();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal (Ctrl+C)");
                break;
            }
            update = updates.recv() => match update {
                Ok(StoreUpdate::Connection(true)) => {
                    feed.send_command(&WsCommand::subscribe(&config.symbol, &config.tf));
                }
                Ok(StoreUpdate::Connection(false)) => tracing::warn!("Live feed disconnected"),
                Ok(StoreUpdate::Event(event)) => {
                    markers.add_event(&event);
                }
                Ok(StoreUpdate::Bar(bar)) => {
                    tracing::debug!("Bar {} at {} close {}", bar.idx, format_ts(bar.ts as i64), bar.c);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::warn!("Dropped {} feed updates", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    markers.clear();
    feed.disable();
    Ok(())
}

#[cfg(feature = "websocket")]
async fn run_replay(config: &ClientConfig, speed: f64) -> anyhow::Result<()> {
    use chan_overlay::feed::{FeedStore, LiveFeedController, ReplayMode, StoreUpdate, WebSocketConnector};
    use chan_overlay::replay::ReplaySessionController;
    use tokio::sync::broadcast::error::RecvError;

    let store = FeedStore::new();
    let mut updates = store.subscribe();
    let feed = LiveFeedController::new(WebSocketConnector::from_config(config), store.clone(), config);
    let replay = ReplaySessionController::new(ChanApiClient::new(config)?, store);
    let mut markers = MarkerManager::new();
    markers.attach(LoggedSeries);
    feed.enable();

    let started = replay
        .start(&config.symbol, &config.tf)
        .await
        .context("Failed to start replay session")?;
    tracing::info!("Replay session {} with {} bars", started.session_id, started.total_bars);
    replay.play(speed).await.context("Failed to start playback")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal (Ctrl+C)");
                break;
            }
            update = updates.recv() => match update {
                Ok(StoreUpdate::ReplayStatus(status)) => {
                    tracing::info!(
                        "Replay {:?} {}/{} at {}x",
                        status.mode,
                        status.current_idx,
                        status.total_bars,
                        status.speed
                    );
                    if status.mode == ReplayMode::Done {
                        break;
                    }
                }
                Ok(StoreUpdate::Event(event)) => {
                    markers.add_event(&event);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::warn!("Dropped {} feed updates", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    replay.stop();
    markers.clear();
    feed.disable();
    Ok(())
}

#[cfg(not(feature = "websocket"))]
async fn run_live(_config: &ClientConfig) -> anyhow::Result<()> {
    Err(anyhow!("live mode requires the `websocket` feature"))
}

#[cfg(not(feature = "websocket"))]
async fn run_replay(_config: &ClientConfig, _speed: f64) -> anyhow::Result<()> {
    Err(anyhow!("replay mode requires the `websocket` feature"))
}
