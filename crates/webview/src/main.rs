use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use viewconf::BrowserConfig;
use webview::pcm::pcm16_le_samples;
use webview::{telemetry, web, AudioClip, ConfigUpdate, Webview, WebviewConfig};

/// Serve a browser page that Rust code can draw on, play through and listen with.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file to use in place of ./webview.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Page title
    #[arg(long)]
    title: Option<String>,

    /// Verbose channel logging
    #[arg(long)]
    debug: bool,

    /// Launch a browser on the page once the server is listening
    #[arg(long)]
    open: bool,

    /// Open the browser fullscreen with no UI
    #[arg(long)]
    kiosk: bool,

    /// OTLP gRPC endpoint for OpenTelemetry (e.g., "127.0.0.1:4317")
    #[arg(long)]
    otlp_endpoint: Option<String>,

    /// Record the browser microphone to this WAV file once a recorder connects
    #[arg(long)]
    record: Option<PathBuf>,

    /// Sample rate written to the WAV header
    #[arg(long, default_value = "44100")]
    record_rate: u32,

    /// Play this audio file once a player connects
    #[arg(long)]
    play: Option<PathBuf>,

    /// Seconds the player waits before starting the clip
    #[arg(long, default_value = "0")]
    play_delay: f64,

    /// Seconds to wait for the player to report completion
    #[arg(long, default_value = "30")]
    play_timeout: u64,
}

type WavSink = hound::WavWriter<std::io::BufWriter<std::fs::File>>;

const PEER_POLL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        WebviewConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    config.set(ConfigUpdate {
        title: cli.title.clone(),
        host: cli.host.clone(),
        port: cli.port,
        debug: cli.debug.then_some(true),
        kiosk_mode: cli.kiosk.then_some(true),
        ..Default::default()
    });
    if let Some(endpoint) = &cli.otlp_endpoint {
        config.logging.otlp_endpoint = Some(endpoint.clone());
    }

    let log_control = telemetry::init(&config.logging).context("Failed to initialize logging")?;

    let addr = config.bind_addr();
    let browser = config.browser.clone();
    let webview = Webview::new(config);
    webview.attach_log_control(log_control);

    webview.register_event_callback(|element_id, event_type| {
        tracing::info!(element_id, event_type, "UI event");
        Ok(())
    });

    let shutdown_token = CancellationToken::new();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let app = web::router(webview.clone());
    let shutdown_token_srv = shutdown_token.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_token_srv.cancelled().await;
        tracing::info!("Server shutdown signal received");
    });
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("Server shutdown with error: {:?}", e);
        }
    });

    tracing::info!("Webview serving on http://{}", addr);
    tracing::info!("   Health: GET http://{}/health", addr);

    let mut browser_process = if cli.open {
        launch_browser(&browser, &format!("http://{}/", addr))
    } else {
        None
    };

    let mut tasks = Vec::new();

    if let Some(path) = cli.record.clone() {
        let webview = webview.clone();
        let cancel = shutdown_token.clone();
        let rate = cli.record_rate;
        tasks.push(tokio::spawn(async move {
            if let Err(e) = record(webview, path, rate, cancel).await {
                tracing::error!("Recording failed: {:#}", e);
            }
        }));
    }

    if let Some(path) = cli.play.clone() {
        let webview = webview.clone();
        let cancel = shutdown_token.clone();
        let delay = cli.play_delay;
        let timeout = Duration::from_secs(cli.play_timeout);
        tasks.push(tokio::spawn(async move {
            if let Err(e) = play(webview, path, delay, timeout, cancel).await {
                tracing::error!("Playback failed: {:#}", e);
            }
        }));
    }

    // Handle both SIGINT (Ctrl+C) and SIGTERM
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate() => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
    shutdown_token.cancel();

    if let Some(child) = browser_process.as_mut() {
        if let Err(e) = child.kill().await {
            tracing::debug!("Browser already gone: {}", e);
        }
    }

    for task in tasks {
        let _ = task.await;
    }
    // Upgraded sockets can outlive graceful shutdown; don't hang on them.
    let _ = tokio::time::timeout(Duration::from_secs(2), server_task).await;

    tracing::info!("Shutdown complete");
    telemetry::shutdown()?;

    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Start the configured browser on `url`. Failure is logged, not fatal.
fn launch_browser(config: &BrowserConfig, url: &str) -> Option<tokio::process::Child> {
    let args = config.browser_args();
    match tokio::process::Command::new(&config.command)
        .args(&args)
        .arg(url)
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => {
            tracing::info!(command = %config.command, ?args, "Browser launched on {}", url);
            Some(child)
        }
        Err(e) => {
            tracing::warn!(command = %config.command, "Failed to launch browser: {}", e);
            None
        }
    }
}

/// Poll until `ready` holds. False if shutdown came first.
async fn wait_until(cancel: &CancellationToken, ready: impl Fn() -> bool) -> bool {
    let mut interval = tokio::time::interval(PEER_POLL);
    loop {
        if ready() {
            return true;
        }
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = interval.tick() => {}
        }
    }
}

async fn record(
    webview: Arc<Webview>,
    path: PathBuf,
    sample_rate: u32,
    cancel: CancellationToken,
) -> Result<()> {
    tracing::info!("Waiting for a recorder to connect...");
    if !wait_until(&cancel, || webview.capture().is_bound()).await {
        return Ok(());
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let writer = hound::WavWriter::create(&path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let writer: Arc<Mutex<Option<WavSink>>> = Arc::new(Mutex::new(Some(writer)));

    let sink = writer.clone();
    let started = webview.start_capture(move |pcm| {
        let mut guard = sink
            .lock()
            .map_err(|_| anyhow::anyhow!("WAV writer lock poisoned"))?;
        if let Some(writer) = guard.as_mut() {
            for sample in pcm16_le_samples(&pcm) {
                writer.write_sample(sample)?;
            }
        }
        Ok(())
    });
    if !started {
        anyhow::bail!("Recorder disconnected before capture could start");
    }
    tracing::info!("Recording to {}", path.display());

    cancel.cancelled().await;
    webview.stop_capture();

    let finished = writer
        .lock()
        .map_err(|_| anyhow::anyhow!("WAV writer lock poisoned"))?
        .take();
    if let Some(writer) = finished {
        writer
            .finalize()
            .with_context(|| format!("Failed to finalize {}", path.display()))?;
        tracing::info!("Recording saved to {}", path.display());
    }
    Ok(())
}

async fn play(
    webview: Arc<Webview>,
    path: PathBuf,
    delay: f64,
    timeout: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let clip = AudioClip::from_file(&path)?;

    tracing::info!("Waiting for a player to connect...");
    if !wait_until(&cancel, || webview.playback().is_bound()).await {
        return Ok(());
    }

    let id = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        id = webview.enqueue_audio(clip, delay, timeout) => id,
    };

    if webview.playback().is_pending(&id) {
        tracing::warn!(%id, "Player did not report completion within {:?}", timeout);
    } else {
        tracing::info!(%id, "Played {}", path.display());
    }
    Ok(())
}
