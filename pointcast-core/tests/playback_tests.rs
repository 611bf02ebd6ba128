// File: pointcast-core/tests/playback_tests.rs
//
// Behavior of the overlay playback state machine: strict FIFO, no
// overlapping playback, the fixed GIF timer, skip, and graceful
// degradation when speech synthesis is down.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use pointcast_common::models::MediaKind;
use pointcast_core::overlay::playback::{
    OverlayPlaybackClient, PlaybackState, GIF_PLAYBACK, MAX_QUEUE_DEPTH,
};
use pointcast_core::test_utils::{
    sample_command, viewer_tts, FakeSynthesizer, RecordingMediaSink, SinkEvent,
};

fn spawn_client(
    synth: Arc<FakeSynthesizer>,
    sink: Arc<RecordingMediaSink>,
    reward_filter: Option<String>,
) -> (
    Arc<OverlayPlaybackClient>,
    mpsc::UnboundedSender<pointcast_common::models::PlaybackCommand>,
    tokio::task::JoinHandle<()>,
) {
    let client = Arc::new(OverlayPlaybackClient::new(synth, sink, reward_filter));
    let (tx, rx) = mpsc::unbounded_channel();
    let runner = Arc::clone(&client);
    let handle = tokio::spawn(async move { runner.run(rx).await });
    (client, tx, handle)
}

#[tokio::test(start_paused = true)]
async fn commands_play_in_arrival_order_without_overlap() {
    let (sink, gate) = RecordingMediaSink::gated();
    let sink = Arc::new(sink);
    let (_client, tx, handle) =
        spawn_client(Arc::new(FakeSynthesizer::new()), Arc::clone(&sink), None);

    tx.send(sample_command("first", MediaKind::Video)).unwrap();
    tx.send(sample_command("second", MediaKind::Audio)).unwrap();
    sleep(Duration::from_millis(1)).await;

    // Only the first command has reached the sink; the second waits.
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], SinkEvent::Media { kind: MediaKind::Video, .. }));

    gate.add_permits(1);
    sleep(Duration::from_millis(1)).await;

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], SinkEvent::Media { kind: MediaKind::Audio, .. }));

    gate.add_permits(1);
    drop(tx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn gif_playback_holds_for_the_fixed_timer() {
    let sink = Arc::new(RecordingMediaSink::new());
    let (_client, tx, handle) =
        spawn_client(Arc::new(FakeSynthesizer::new()), Arc::clone(&sink), None);

    tx.send(sample_command("gif-reward", MediaKind::Gif)).unwrap();
    tx.send(sample_command("after-gif", MediaKind::Video)).unwrap();
    drop(tx);
    handle.await.unwrap();

    let timed = sink.timed_events();
    assert_eq!(timed.len(), 2);
    assert!(matches!(&timed[0].0, SinkEvent::Image { .. }));
    assert!(matches!(&timed[1].0, SinkEvent::Media { .. }));
    // The follow-up command had to wait out the GIF timer.
    assert!(timed[1].1 - timed[0].1 >= GIF_PLAYBACK);
}

#[tokio::test(start_paused = true)]
async fn synthesis_failure_still_plays_the_media() {
    let synth = Arc::new(FakeSynthesizer::failing());
    let sink = Arc::new(RecordingMediaSink::new());
    let (client, tx, handle) = spawn_client(Arc::clone(&synth), Arc::clone(&sink), None);
    let state = client.state();

    let mut cmd = sample_command("tts-reward", MediaKind::Video);
    cmd.tts_config = Some(viewer_tts());
    cmd.viewer_username = Some("Ana".to_string());
    cmd.viewer_message = Some("hola".to_string());
    tx.send(cmd).unwrap();
    drop(tx);
    handle.await.unwrap();

    assert_eq!(synth.call_count(), 1);
    let events = sink.events();
    assert_eq!(events.len(), 1, "media must play even when the voice is down");
    assert!(matches!(&events[0], SinkEvent::Media { .. }));
    assert_eq!(*state.borrow(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn synthesized_speech_plays_before_the_media() {
    let synth = Arc::new(FakeSynthesizer::new());
    let sink = Arc::new(RecordingMediaSink::new());
    let (_client, tx, handle) = spawn_client(Arc::clone(&synth), Arc::clone(&sink), None);

    let mut cmd = sample_command("tts-reward", MediaKind::Video);
    cmd.tts_config = Some(viewer_tts());
    cmd.viewer_username = Some("Ana".to_string());
    cmd.viewer_message = Some("hola".to_string());
    tx.send(cmd).unwrap();
    drop(tx);
    handle.await.unwrap();

    let request = synth.last_request().expect("synthesizer was called");
    assert_eq!(request.text, "Ana dice: hola");

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], SinkEvent::Audio { .. }));
    assert!(matches!(&events[1], SinkEvent::Media { .. }));
}

#[tokio::test(start_paused = true)]
async fn skip_aborts_the_current_item_and_moves_on() {
    let (sink, gate) = RecordingMediaSink::gated();
    let sink = Arc::new(sink);
    let (client, tx, handle) =
        spawn_client(Arc::new(FakeSynthesizer::new()), Arc::clone(&sink), None);

    tx.send(sample_command("stuck", MediaKind::Video)).unwrap();
    tx.send(sample_command("next", MediaKind::Video)).unwrap();
    sleep(Duration::from_millis(1)).await;
    assert_eq!(sink.events().len(), 1);

    // No permit released; only the skip can unblock the first item.
    client.skip_handle().notify_one();
    sleep(Duration::from_millis(1)).await;

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(
        matches!(&events[1], SinkEvent::Media { url, .. } if url.contains("next")),
        "the queued item should start after the skip"
    );

    gate.add_permits(2);
    drop(tx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn skip_pressed_while_idle_does_not_cancel_the_next_alert() {
    let (sink, gate) = RecordingMediaSink::gated();
    let sink = Arc::new(sink);
    let (client, tx, handle) =
        spawn_client(Arc::new(FakeSynthesizer::new()), Arc::clone(&sink), None);

    // Nothing is playing; this skip has no target.
    client.skip_handle().notify_one();
    sleep(Duration::from_millis(1)).await;

    tx.send(sample_command("first", MediaKind::Video)).unwrap();
    sleep(Duration::from_millis(1)).await;

    // The alert started and is still held by the gate, not cut short.
    assert_eq!(sink.events().len(), 1);

    tx.send(sample_command("second", MediaKind::Video)).unwrap();
    sleep(Duration::from_millis(1)).await;
    assert_eq!(sink.events().len(), 1, "first alert must still be playing");

    gate.add_permits(2);
    drop(tx);
    handle.await.unwrap();
    assert_eq!(sink.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn commands_outside_the_reward_scope_are_discarded() {
    let sink = Arc::new(RecordingMediaSink::new());
    let (_client, tx, handle) = spawn_client(
        Arc::new(FakeSynthesizer::new()),
        Arc::clone(&sink),
        Some("wanted".to_string()),
    );

    tx.send(sample_command("other", MediaKind::Video)).unwrap();
    tx.send(sample_command("wanted", MediaKind::Video)).unwrap();
    drop(tx);
    handle.await.unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], SinkEvent::Media { url, .. } if url.contains("wanted")));
}

#[tokio::test(start_paused = true)]
async fn queue_drops_newest_beyond_the_depth_cap() {
    let (sink, gate) = RecordingMediaSink::gated();
    let sink = Arc::new(sink);
    let (_client, tx, handle) =
        spawn_client(Arc::new(FakeSynthesizer::new()), Arc::clone(&sink), None);

    // One playing plus a full queue plus five that must be dropped.
    let total = 1 + MAX_QUEUE_DEPTH + 5;
    for i in 0..total {
        tx.send(sample_command(&format!("r{i}"), MediaKind::Video)).unwrap();
    }
    sleep(Duration::from_millis(1)).await;

    gate.add_permits(total);
    drop(tx);
    handle.await.unwrap();

    assert_eq!(sink.events().len(), 1 + MAX_QUEUE_DEPTH);
}
