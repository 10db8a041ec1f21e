use super::*;
use crate::foundation::core::Rgb8;
use crate::replay::canvas::CanvasBuffer;
use crate::viewport::select::DisplayScale;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "placeplay_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn meta(index: u64, rank: u32) -> FrameMeta {
    FrameMeta {
        index,
        second: index as i64,
        rank: Some(rank),
    }
}

#[test]
fn first_frame_per_requested_rank_is_saved() {
    let dir = temp_dir("capture");
    let mut sink = SnapshotCaptureSink::with_prefix(&dir, "2022_", [101, 103]);
    sink.begin(SinkConfig {
        width: 2,
        height: 2,
        scale: DisplayScale::new(1.0).unwrap(),
    })
    .unwrap();

    let mut c = CanvasBuffer::new(2, 2).unwrap();
    sink.push_frame(meta(0, 100), c.snapshot()).unwrap();
    c.set(0, 0, Rgb8::new(1, 1, 1));
    sink.push_frame(meta(1, 101), c.snapshot()).unwrap();
    c.set(0, 0, Rgb8::new(2, 2, 2));
    sink.push_frame(meta(2, 101), c.snapshot()).unwrap();
    assert!(sink.wants_more());
    sink.end().unwrap();

    assert_eq!(sink.captured, vec![(101, dir.join("2022_101.png"))]);
    assert_eq!(sink.pending().collect::<Vec<_>>(), vec![103]);
    let img = image::open(dir.join("2022_101.png")).unwrap().to_rgb8();
    assert_eq!(img.get_pixel(0, 0).0, [1, 1, 1]);
    assert!(!dir.join("2022_100.png").exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn done_once_every_rank_is_captured() {
    let dir = temp_dir("capture_done");
    let mut sink = SnapshotCaptureSink::new(&dir, [(100, "base.png".to_owned())]);
    sink.push_frame(meta(0, 100), CanvasBuffer::new(1, 1).unwrap().snapshot())
        .unwrap();
    assert!(!sink.wants_more());
    assert!(dir.join("base.png").is_file());
    std::fs::remove_dir_all(&dir).ok();
}
