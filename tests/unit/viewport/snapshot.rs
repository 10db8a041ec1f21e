use super::*;
use crate::config::dataset::DatasetConfig;
use crate::foundation::core::Rgb8;
use crate::viewport::select::{DisplayScale, ViewportSize, plan_viewport};

fn temp_dir(name: &str) -> std::path::PathBuf {
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

/// Pixel (x, y) gets color (x % 256, y % 256, 7).
fn write_gradient(path: &Path, w: u32, h: u32) {
    let img = image::RgbImage::from_fn(w, h, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 7]));
    img.save(path).unwrap();
}

#[test]
fn load_region_crops_canonical_coordinates() {
    let dir = temp_dir("snap_crop");
    let path = dir.join("base.png");
    write_gradient(&path, 40, 30);

    let c = load_region(&path, CanvasRect::new(10, 5, 20, 25).unwrap()).unwrap();
    assert_eq!((c.width(), c.height()), (10, 20));
    assert_eq!(c.get(0, 0), Some(Rgb8::new(10, 5, 7)));
    assert_eq!(c.get(9, 19), Some(Rgb8::new(19, 24, 7)));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn load_region_rejects_small_snapshot() {
    let dir = temp_dir("snap_small");
    let path = dir.join("base.png");
    write_gradient(&path, 8, 8);
    assert!(load_region(&path, CanvasRect::new(0, 0, 9, 8).unwrap()).is_err());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_snapshot_falls_back_to_blank_first_rank() {
    let dir = temp_dir("snap_missing");
    let cfg = DatasetConfig::builtin();
    let e = cfg.epoch("2022").unwrap();
    let s = DisplayScale::new(2.0).unwrap();
    let plan = plan_viewport(e, 1200, 100, ViewportSize { width: 40, height: 30 }, s).unwrap();
    assert_eq!(plan.start_rank, 113);

    let (canvas, rank) = seed_canvas(&plan, &dir).unwrap();
    assert_eq!(rank, 100);
    assert_eq!((canvas.width(), canvas.height()), (40, 30));
    assert!(canvas.as_bytes().iter().all(|&b| b == 255));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn snapshot_seed_starts_at_stage_rank() {
    let dir = temp_dir("snap_seed");
    write_gradient(&dir.join("xBase.png"), 2000, 1000);
    let cfg = DatasetConfig::builtin();
    let e = cfg.epoch("2022").unwrap();
    let s = DisplayScale::new(2.0).unwrap();
    let plan = plan_viewport(e, 1200, 100, ViewportSize { width: 40, height: 30 }, s).unwrap();

    let (canvas, rank) = seed_canvas(&plan, &dir).unwrap();
    assert_eq!(rank, 113);
    assert_eq!(canvas.get(0, 0), Some(Rgb8::new((1200 % 256) as u8, 100, 7)));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn saved_frame_reads_back() {
    let dir = temp_dir("snap_save");
    let mut c = CanvasBuffer::new(3, 2).unwrap();
    c.set(2, 1, Rgb8::new(1, 2, 3));
    let path = dir.join("nested").join("f.png");
    save_frame_png(&c.snapshot(), &path).unwrap();

    let back = image::open(&path).unwrap().to_rgb8();
    assert_eq!(back.dimensions(), (3, 2));
    assert_eq!(back.get_pixel(2, 1).0, [1, 2, 3]);
    assert_eq!(back.get_pixel(0, 0).0, [255, 255, 255]);
    std::fs::remove_dir_all(&dir).ok();
}
