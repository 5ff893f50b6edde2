//! End-to-end ticks against an in-memory canvas

use assert_matches::assert_matches;
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use tile_watch::{MonitorPhase, Severity, TickStatus};

use crate::helpers::*;

#[tokio::test]
async fn test_matching_canvas_reports_zero_across_four_tiles() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    monitor.configure(straddling_config(path)).await.unwrap();

    let outcome = monitor.tick_now().await.unwrap();
    assert_eq!(outcome.percentage, 0.0);
    assert_eq!(outcome.severity, Severity::Normal);
    assert_eq!(outcome.tiles_required, 4);
    assert_eq!(outcome.tiles_fetched, 4);

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.status, TickStatus::Ok);
    assert_eq!(snapshot.detections, 0);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_changed_pixels_are_classified() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);
    // one pixel in each tile: 4 of 16
    for (x, y) in [(8, 8), (11, 8), (8, 11), (11, 11)] {
        canvas.put(x, y, BLUE);
    }

    let monitor = spawn_monitor(&canvas);
    monitor.configure(straddling_config(path)).await.unwrap();

    let outcome = monitor.tick_now().await.unwrap();
    assert_eq!(outcome.percentage, 25.0);
    assert_eq!(outcome.severity.label(), "low");
    assert_eq!(outcome.stats.differing_pixels, 4);
    assert_eq!(outcome.stats.opaque_pixels, 16);

    canvas.fill(8, 8, 4, 3, BLUE);
    let outcome = monitor.tick_now().await.unwrap();
    assert_eq!(outcome.severity.label(), "high");

    // the scheduled first tick may have counted as well
    let snapshot = monitor.snapshot();
    assert!(snapshot.detections >= 2);
    assert!(snapshot.last_detection.is_some());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_transparent_template_pixels_are_ignored() {
    let templates = TemplateDir::new();
    let mut template = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
    template.put_pixel(1, 1, RED);
    template.put_pixel(2, 2, RED);
    let path = templates.write("sparse.png", &template);

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, BLUE);
    canvas.put(9, 9, RED);
    canvas.put(10, 10, RED);

    let monitor = spawn_monitor(&canvas);
    monitor.configure(straddling_config(path)).await.unwrap();

    let outcome = monitor.tick_now().await.unwrap();
    assert_eq!(outcome.percentage, 0.0);
    assert_eq!(outcome.stats.opaque_pixels, 2);

    let snapshot = monitor.snapshot();
    let latest = snapshot.latest.as_ref().unwrap();
    // masked live crop keeps only the footprint
    assert_eq!(latest.live.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    assert_eq!(latest.live.get_pixel(1, 1), &RED);
    assert_eq!(latest.diff.dimensions(), (4, 4));

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_history_records_each_successful_tick() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    monitor.configure(straddling_config(path)).await.unwrap();

    for _ in 0..3 {
        monitor.tick_now().await.unwrap();
    }

    let history = monitor.snapshot().history.clone();
    assert!(history.len() >= 3);
    assert!(history.windows(2).all(|w| w[0].elapsed_secs <= w[1].elapsed_secs));

    monitor.reset_history().await.unwrap();
    let mut state = monitor.watch();
    state.wait_for(|s| s.history.is_empty()).await.unwrap();

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_template_crop_and_explicit_size() {
    let templates = TemplateDir::new();
    let mut sheet = RgbaImage::from_pixel(10, 10, BLUE);
    for y in 2..6 {
        for x in 3..7 {
            sheet.put_pixel(x, y, RED);
        }
    }
    let path = templates.write("sheet.png", &sheet);

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let mut config = straddling_config(path);
    config.template_crop = Some([3, 2, 7, 6]);
    config.size = Some([4, 4]);

    let monitor = spawn_monitor(&canvas);
    monitor.configure(config).await.unwrap();

    let outcome = monitor.tick_now().await.unwrap();
    assert_eq!(outcome.percentage, 0.0);
    assert_matches!(monitor.snapshot().phase, MonitorPhase::Running);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_tick_events_are_broadcast() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, BLUE);

    let monitor = spawn_monitor(&canvas);
    let mut events = monitor.subscribe();
    monitor.configure(straddling_config(path)).await.unwrap();

    // the first scheduled tick fires right after configuration
    let event = events.recv().await.unwrap();
    assert_eq!(event.tick, 1);
    assert_eq!(event.previous_severity, None);
    let outcome = event.result.unwrap();
    assert_eq!(outcome.percentage, 100.0);
    assert_eq!(outcome.severity.label(), "high");

    monitor.shutdown().await.unwrap();
}
