//! Scheduler timing on a paused clock

use std::time::Duration;

use pretty_assertions::assert_eq;
use tile_watch::TickEvent;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::helpers::*;

async fn next_tick_at(events: &mut broadcast::Receiver<TickEvent>, start: Instant) -> (u64, Duration) {
    let event = events.recv().await.unwrap();
    (event.tick, start.elapsed())
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_is_immediate_then_interval_after_completion() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    let mut events = monitor.subscribe();

    let mut config = straddling_config(path);
    config.poll_interval_secs = 5;

    let start = Instant::now();
    monitor.configure(config).await.unwrap();

    assert_eq!(next_tick_at(&mut events, start).await, (1, Duration::ZERO));
    assert_eq!(next_tick_at(&mut events, start).await, (2, Duration::from_secs(5)));
    assert_eq!(next_tick_at(&mut events, start).await, (3, Duration::from_secs(10)));

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_keeps_scheduled_deadline() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    let mut events = monitor.subscribe();

    let mut config = straddling_config(path);
    config.poll_interval_secs = 10;

    let start = Instant::now();
    monitor.configure(config).await.unwrap();
    assert_eq!(next_tick_at(&mut events, start).await.0, 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    monitor.update_interval(Duration::from_secs(1)).await.unwrap();

    // the tick already due at t=10 is not pulled forward
    assert_eq!(next_tick_at(&mut events, start).await, (2, Duration::from_secs(10)));
    assert_eq!(next_tick_at(&mut events, start).await, (3, Duration::from_secs(11)));

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_interval_floor() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    let mut events = monitor.subscribe();

    let start = Instant::now();
    monitor.configure(straddling_config(path)).await.unwrap();
    monitor.update_interval(Duration::from_millis(50)).await.unwrap();

    assert_eq!(next_tick_at(&mut events, start).await.0, 1);

    // whichever interval the first deadline used, later ticks are floored to 500 ms
    let (_, second) = next_tick_at(&mut events, start).await;
    let (_, third) = next_tick_at(&mut events, start).await;
    assert_eq!(third - second, Duration::from_millis(500));

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_manual_tick_does_not_move_schedule() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    let mut events = monitor.subscribe();

    let mut config = straddling_config(path);
    config.poll_interval_secs = 10;

    let start = Instant::now();
    monitor.configure(config).await.unwrap();
    assert_eq!(next_tick_at(&mut events, start).await.0, 1);

    tokio::time::sleep(Duration::from_secs(3)).await;
    monitor.tick_now().await.unwrap();
    assert_eq!(next_tick_at(&mut events, start).await, (2, Duration::from_secs(3)));

    assert_eq!(next_tick_at(&mut events, start).await, (3, Duration::from_secs(10)));

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stopped_monitor_does_not_tick() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    let mut events = monitor.subscribe();

    monitor.configure(straddling_config(path)).await.unwrap();
    events.recv().await.unwrap();
    monitor.stop().await.unwrap();

    let waited = tokio::time::timeout(Duration::from_secs(30), events.recv()).await;
    assert!(waited.is_err());

    // resuming ticks immediately
    let start = Instant::now();
    monitor.start().await.unwrap();
    let (_, at) = next_tick_at(&mut events, start).await;
    assert_eq!(at, Duration::ZERO);

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reconfigure_while_running_keeps_deadline() {
    let templates = TemplateDir::new();
    let path = templates.write("template.png", &solid_template());

    let canvas = FakeCanvas::new();
    canvas.fill(8, 8, 4, 4, RED);

    let monitor = spawn_monitor(&canvas);
    let mut events = monitor.subscribe();

    let mut config = straddling_config(path);
    config.poll_interval_secs = 10;

    let start = Instant::now();
    monitor.configure(config.clone()).await.unwrap();
    assert_eq!(next_tick_at(&mut events, start).await.0, 1);

    tokio::time::sleep(Duration::from_secs(4)).await;
    config.poll_interval_secs = 2;
    monitor.configure(config).await.unwrap();

    assert_eq!(next_tick_at(&mut events, start).await, (2, Duration::from_secs(10)));
    assert_eq!(next_tick_at(&mut events, start).await, (3, Duration::from_secs(12)));

    monitor.shutdown().await.unwrap();
}
