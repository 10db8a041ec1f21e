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

fn cfg(width: u32, height: u32, scale: f64) -> SinkConfig {
    SinkConfig {
        width,
        height,
        scale: DisplayScale::new(scale).unwrap(),
    }
}

fn meta(index: u64) -> FrameMeta {
    FrameMeta {
        index,
        second: 1_648_800_000 + index as i64,
        rank: Some(100),
    }
}

#[test]
fn frames_are_magnified_with_nearest_filter() {
    let dir = temp_dir("png_scale");
    let mut sink = PngSequenceSink::new(dir.join("out"), None);
    sink.begin(cfg(2, 1, 3.0)).unwrap();

    let mut c = CanvasBuffer::new(2, 1).unwrap();
    c.set(1, 0, Rgb8::new(10, 20, 30));
    sink.push_frame(meta(0), c.snapshot()).unwrap();
    sink.end().unwrap();

    let img = image::open(sink.frame_path(0)).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (6, 3));
    assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255]);
    assert_eq!(img.get_pixel(4, 1).0, [10, 20, 30]);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn frame_limit_stops_writing() {
    let dir = temp_dir("png_limit");
    let mut sink = PngSequenceSink::new(&dir, Some(2));
    sink.begin(cfg(4, 4, 1.0)).unwrap();
    let c = CanvasBuffer::new(4, 4).unwrap();
    for i in 0..3 {
        sink.push_frame(meta(i), c.snapshot()).unwrap();
    }
    assert_eq!(sink.written(), 2);
    assert!(!sink.wants_more());
    assert!(sink.frame_path(1).is_file());
    assert!(!sink.frame_path(2).exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn zero_limit_and_missing_begin_are_rejected() {
    let dir = temp_dir("png_invalid");
    let mut sink = PngSequenceSink::new(&dir, Some(0));
    assert!(sink.begin(cfg(4, 4, 1.0)).is_err());

    let mut sink = PngSequenceSink::new(&dir, None);
    let c = CanvasBuffer::new(4, 4).unwrap();
    assert!(sink.push_frame(meta(0), c.snapshot()).is_err());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn half_scale_shrinks_frames() {
    let dir = temp_dir("png_half");
    let mut sink = PngSequenceSink::new(&dir, None);
    sink.begin(cfg(5, 4, 0.5)).unwrap();
    sink.push_frame(meta(0), CanvasBuffer::new(5, 4).unwrap().snapshot())
        .unwrap();
    let img = image::open(sink.frame_path(0)).unwrap();
    assert_eq!((img.width(), img.height()), (3, 2));
    std::fs::remove_dir_all(&dir).ok();
}
