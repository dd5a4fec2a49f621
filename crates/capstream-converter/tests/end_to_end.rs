//! Whole-path coverage: encode → buffer → rotate → segment files → convert.

use capstream_codec::FrameEncoder;
use capstream_converter::{convert_recording, FrameMuxer};
use capstream_core::{rgb, Pixel, RecorderConfig, Resolution};
use capstream_recorder::{
    DirectorySegmentStore, FrameSource, RecorderEvent, RecorderSession, RotatingSegmentWriter,
    SyntheticSource,
};
use tokio::sync::mpsc;

struct CollectingMuxer {
    frames: Vec<(Vec<Pixel>, u32)>,
}

impl FrameMuxer for CollectingMuxer {
    fn push_frame(&mut self, pixels: &[Pixel], timestamp_ms: u32) -> anyhow::Result<()> {
        self.frames.push((pixels.to_vec(), timestamp_ms));
        Ok(())
    }
}

/// Deterministic frame content for index `i`: a gradient with one row that
/// tracks the index.
fn pattern(resolution: Resolution, i: u32) -> Vec<Pixel> {
    let w = resolution.width as usize;
    let h = resolution.height as usize;
    let hot_row = i as usize % h;
    let mut pixels = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            pixels.push(if y == hot_row {
                rgb(255, i as u8, 0)
            } else {
                rgb(x as u8, y as u8, 128)
            });
        }
    }
    pixels
}

#[tokio::test]
async fn rotated_recording_round_trips_exactly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let resolution = Resolution::new(16, 12);
    let config = RecorderConfig {
        use_byte_compression: true,
        keyframe_interval: 20,
        // Timers idle; rotation is requested manually below.
        flush_period_ms: 3_600_000,
        rotation_period_ms: 3_600_000,
        ..RecorderConfig::default()
    };

    // Drive 25 frames through the writer by hand so the cut point is exact:
    // a rotation requested mid-stream must wait for the next keyframe, which
    // with keyframe_interval = 20 is frame index 20.
    let store = DirectorySegmentStore::new(dir.path(), "capture").expect("store");
    let writer =
        RotatingSegmentWriter::open(Box::new(store), resolution, &config).expect("writer");
    let mut encoder = FrameEncoder::new(resolution);

    for i in 0..25u32 {
        let keyframe = i % config.keyframe_interval == 0;
        let mut pixels = pattern(resolution, i);
        let encoded = encoder.encode(&mut pixels, i * 190, keyframe).expect("encode");
        if keyframe {
            assert!(encoded.has_changes, "full frames always carry a payload");
        }
        writer.write_frame(&encoded, keyframe).expect("write");
        if i == 10 {
            writer.request_rotation();
        }
    }
    writer.shutdown().expect("shutdown");

    // Two segments: frames 0..=19 and 20..=24, each independently decodable.
    assert!(dir.path().join("capture_0000.cap").exists());
    assert!(dir.path().join("capture_0001.cap").exists());
    assert!(!dir.path().join("capture_0002.cap").exists());

    let mut muxer = CollectingMuxer { frames: Vec::new() };
    let frames = convert_recording(dir.path(), "capture", true, &mut muxer).expect("convert");
    assert_eq!(frames, 25);

    for (i, (pixels, timestamp_ms)) in muxer.frames.iter().enumerate() {
        let i = i as u32;
        assert_eq!(*timestamp_ms, i * 190);
        assert_eq!(pixels, &pattern(resolution, i), "frame {i} content");
    }
}

#[tokio::test]
async fn live_session_converts_back_without_drops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let resolution = Resolution::new(24, 18);
    let config = RecorderConfig {
        frame_interval_ms: 5,
        flush_period_ms: 3_600_000,
        rotation_period_ms: 3_600_000,
        ..RecorderConfig::default()
    };
    let tick_ms = config.frame_interval_ms as u32;

    let source = SyntheticSource::new(resolution, tick_ms);
    let store = DirectorySegmentStore::new(dir.path(), "live").expect("store");
    let writer =
        RotatingSegmentWriter::open(Box::new(store), resolution, &config).expect("writer");
    let rotation = writer.rotation_handle();

    let (event_tx, mut event_rx) = mpsc::channel::<RecorderEvent>(256);
    let session = RecorderSession::spawn(source, writer, config, event_tx);
    tokio::time::sleep(std::time::Duration::from_millis(40)).await;
    // A cut requested mid-session lands on the next keyframe; converted
    // output must be seamless across the resulting segment boundary.
    rotation.request_rotation();
    tokio::time::sleep(std::time::Duration::from_millis(110)).await;
    let recorded = session.shutdown().await;
    assert!(recorded > 0);

    while let Ok(event) = event_rx.try_recv() {
        if let RecorderEvent::Failed(reason) = event {
            panic!("pipeline failed: {reason}");
        }
    }

    let mut muxer = CollectingMuxer { frames: Vec::new() };
    let converted = convert_recording(dir.path(), "live", true, &mut muxer).expect("convert");

    // Backpressure means every recorded frame reached disk, and conversion
    // reads them back in capture order with their original content.
    assert_eq!(converted, recorded);
    let mut reference = SyntheticSource::new(resolution, tick_ms);
    let mut expected = Vec::new();
    for (i, (pixels, timestamp_ms)) in muxer.frames.iter().enumerate() {
        let ts = reference.capture_frame(&mut expected).expect("reference frame");
        assert_eq!(*timestamp_ms, ts, "frame {i} timestamp");
        assert_eq!(pixels, &expected, "frame {i} content");
    }
}
