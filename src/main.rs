use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use marker_overlay::config::AppConfig;
use marker_overlay::io::{ReplayDetectionSource, load_replay};
use marker_overlay::system::MarkerSession;
use marker_overlay::tracking::Capabilities;
use marker_overlay::viz::RerunScene;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::default(),
    };
    let replay_path = args.next().unwrap_or_else(|| "data/replay.csv".to_string());

    let events = load_replay(&replay_path)?;
    info!("Loaded {} detection events from {}", events.len(), replay_path);

    // World tracking only: overlays are expired by the staleness sweep.
    let source = Arc::new(ReplayDetectionSource::new(Capabilities {
        image_tracking: false,
    }));
    let scene = Arc::new(RerunScene::new("marker-overlay")?);
    let session = MarkerSession::with_http(&config, source.clone(), scene.clone())?;

    session
        .will_appear()
        .join()
        .map_err(|_| anyhow!("dataset loader thread panicked"))?;
    if !session.is_configured() {
        bail!("Tracking not configured, see the log for the dataset error");
    }
    session.did_appear()?;

    let events_rx = session.events();
    let start = Instant::now();
    for event in &events {
        let due = start + Duration::from_millis(event.timestamp_ms);
        if let Some(wait) = due.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }

        scene.set_time(start.elapsed());
        source.replay_event(&session, event, Instant::now());
        scene.log_status(
            session.active_configuration(),
            session.tracker().registry().len(),
        );

        for e in events_rx.try_iter() {
            info!("Session event: {:?}", e);
        }
    }

    // Give the sweep time to expire whatever is still on screen.
    let policy = session.tracker().policy();
    thread::sleep(policy.threshold() + policy.sweep_interval() * 2);
    scene.set_time(start.elapsed());
    scene.log_status(
        session.active_configuration(),
        session.tracker().registry().len(),
    );
    for e in events_rx.try_iter() {
        info!("Session event: {:?}", e);
    }

    info!(
        "Done! Replayed {} events, {} anchors removed by the sweep",
        events.len(),
        source.removed_anchor_count()
    );

    session.will_disappear();
    session.shutdown();

    Ok(())
}
