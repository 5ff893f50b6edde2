//! Degraded backends and rejected configurations

use std::path::PathBuf;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tile_watch::{
    GlobalAnchor, MonitorError, MonitorHandle, MonitorPhase, MonitorSettings, TickStatus,
    TileCoordinate, config::MAX_POLL_INTERVAL,
};

use crate::helpers::*;

fn monitor_error(err: &anyhow::Error) -> &MonitorError {
    err.downcast_ref::<MonitorError>()
        .expect("error should carry a MonitorError")
}

#[tokio::test]
async fn test_no_tiles_leaves_history_untouched() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    let monitor = spawn_monitor(&canvas);
    monitor.configure(straddling_config(path)).await.unwrap();

    let err = monitor.tick_now().await.unwrap_err();
    assert_matches!(monitor_error(&err), MonitorError::NoTileData { tiles: 4 });

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.status, TickStatus::NoTileData);
    assert_eq!(snapshot.phase, MonitorPhase::Running);
    assert!(snapshot.history.is_empty());
    assert!(snapshot.latest.is_none());
    assert!(snapshot.tick_count >= 1);

    // the next tick picks up as soon as the backend recovers
    canvas.fill(8, 8, 4, 4, RED);
    let outcome = monitor.tick_now().await.unwrap();
    assert_eq!(outcome.percentage, 0.0);
    assert_eq!(monitor.snapshot().status, TickStatus::Ok);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_tile_counts_as_difference() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);
    canvas.remove_tile(TileCoordinate::new(1, 1));

    let monitor = spawn_monitor(&canvas);
    monitor.configure(straddling_config(path)).await.unwrap();

    let outcome = monitor.tick_now().await.unwrap();
    assert_eq!(outcome.tiles_fetched, 3);
    assert_eq!(outcome.tiles_required, 4);
    assert_eq!(outcome.percentage, 25.0);
    assert_eq!(outcome.severity.label(), "low");

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_template_keeps_monitor_idle() {
    let canvas = FakeCanvas::new();
    let monitor = spawn_monitor(&canvas);

    let config = straddling_config(PathBuf::from("/nonexistent/template.png"));
    let err = monitor.configure(config).await.unwrap_err();
    assert_matches!(monitor_error(&err), MonitorError::TemplateLoad { .. });

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.phase, MonitorPhase::Idle);
    assert!(snapshot.config_error.is_some());
    assert!(snapshot.config.is_none());
    assert_eq!(canvas.requests(), 0);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_region_and_interval_are_rejected() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    let monitor = spawn_monitor(&canvas);

    let mut config = straddling_config(path.clone());
    config.size = Some([0, 4]);
    let err = monitor.configure(config).await.unwrap_err();
    assert_matches!(
        monitor_error(&err),
        MonitorError::InvalidRegion { width: 0, height: 4 }
    );

    let mut config = straddling_config(path);
    config.poll_interval_secs = 0;
    let err = monitor.configure(config).await.unwrap_err();
    assert_matches!(monitor_error(&err), MonitorError::InvalidInterval);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_reconfiguration_keeps_previous_config_running() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    let good = straddling_config(path);
    monitor.configure(good.clone()).await.unwrap();

    let mut bad = good.clone();
    bad.reference_image_path = PathBuf::from("/nonexistent/other.png");
    assert!(monitor.configure(bad).await.is_err());

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.phase, MonitorPhase::Faulted);
    assert_eq!(snapshot.config.as_ref(), Some(&good));
    assert!(snapshot.config_error.as_deref().unwrap().contains("other.png"));

    // still ticking with the last good configuration
    let outcome = monitor.tick_now().await.unwrap();
    assert_eq!(outcome.percentage, 0.0);

    monitor.configure(good).await.unwrap();
    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.phase, MonitorPhase::Running);
    assert!(snapshot.config_error.is_none());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stop_and_start() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    monitor.configure(straddling_config(path)).await.unwrap();

    monitor.stop().await.unwrap();
    let mut state = monitor.watch();
    state
        .wait_for(|s| s.phase == MonitorPhase::Stopped)
        .await
        .unwrap();

    // manual ticks still work while stopped
    assert!(monitor.tick_now().await.is_ok());

    monitor.start().await.unwrap();
    assert_eq!(monitor.snapshot().phase, MonitorPhase::Running);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_huge_interval_keeps_scheduler_alive() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    let mut config = straddling_config(path);
    config.poll_interval_secs = u64::MAX;
    monitor.configure(config).await.unwrap();
    assert_eq!(monitor.snapshot().poll_interval, MAX_POLL_INTERVAL);

    // the first scheduled tick completes and the next deadline is computed
    let mut state = monitor.watch();
    state.wait_for(|s| s.tick_count >= 1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(monitor.tick_now().await.is_ok());

    monitor.update_interval(Duration::MAX).await.unwrap();
    assert!(monitor.tick_now().await.is_ok());
    assert_eq!(monitor.snapshot().poll_interval, MAX_POLL_INTERVAL);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_oversized_region_is_rejected_at_configure() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    let monitor = spawn_monitor(&canvas);

    let mut config = straddling_config(path.clone());
    config.size = Some([i64::from(u32::MAX), 1]);
    let err = monitor.configure(config).await.unwrap_err();
    assert_matches!(monitor_error(&err), MonitorError::InvalidRegion { .. });

    let mut config = straddling_config(path);
    config.anchor = GlobalAnchor::new(i64::MAX / 2, 0, 0, 0);
    let err = monitor.configure(config).await.unwrap_err();
    assert_matches!(monitor_error(&err), MonitorError::RegionOutOfRange { .. });

    // the actor is still there to answer
    let err = monitor.tick_now().await.unwrap_err();
    assert_matches!(monitor_error(&err), MonitorError::NotConfigured);
    assert_eq!(canvas.requests(), 0);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_zero_tile_size_is_rejected_at_configure() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    let monitor = MonitorHandle::spawn(
        MonitorSettings {
            tile_size: 0,
            ..settings()
        },
        canvas.clone(),
    );

    let err = monitor.configure(straddling_config(path)).await.unwrap_err();
    assert_matches!(monitor_error(&err), MonitorError::InvalidSettings(_));

    let err = monitor.tick_now().await.unwrap_err();
    assert_matches!(monitor_error(&err), MonitorError::NotConfigured);

    monitor.shutdown().await.unwrap();
}
