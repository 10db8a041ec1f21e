use super::*;
use crate::config::dataset::GrowthStage;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{CanvasRect, Rgb8};
use rand::SeedableRng;
use rand::rngs::SmallRng;

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

/// 2022 layout shrunk to a 20x20 canvas.
fn tiny_config() -> DatasetConfig {
    let mut cfg = DatasetConfig::builtin();
    let e = cfg.epochs.iter_mut().find(|e| e.id == "2022").unwrap();
    e.id = "tiny".to_owned();
    e.canvas_width = 20;
    e.canvas_height = 20;
    e.tolerance = 2;
    e.growth = vec![
        GrowthStage {
            rank: 100,
            region: CanvasRect::new(0, 0, 10, 10).unwrap(),
            snapshot: None,
        },
        GrowthStage {
            rank: 113,
            region: CanvasRect::new(0, 0, 20, 10).unwrap(),
            snapshot: Some("xBase.png".to_owned()),
        },
        GrowthStage {
            rank: 134,
            region: CanvasRect::new(0, 0, 20, 20).unwrap(),
            snapshot: Some("yBase.png".to_owned()),
        },
    ];
    cfg
}

fn line(ts: &str, color: &str, x: i32, y: i32) -> String {
    format!("2022-04-01 {ts} UTC,user,{color},{x},{y}\n")
}

#[test]
fn unknown_epoch_is_rejected() {
    let cfg = DatasetConfig::builtin();
    assert!(PlaybackSession::new(&cfg, "1999", "data", "snaps").is_err());
}

#[test]
fn random_epoch_comes_from_config() {
    let cfg = DatasetConfig::builtin();
    let mut rng = SmallRng::seed_from_u64(3);
    for _ in 0..20 {
        let e = PlaybackSession::random_epoch(&cfg, &mut rng).unwrap();
        assert!(e.id == "2022" || e.id == "2023");
    }
    let empty = DatasetConfig {
        display: DisplayConfig::default(),
        epochs: Vec::new(),
    };
    assert!(PlaybackSession::random_epoch(&empty, &mut rng).is_err());
}

#[test]
fn random_plan_fits_the_epoch() {
    let cfg = DatasetConfig::builtin();
    let session = PlaybackSession::new(&cfg, "2023", "data", "snaps").unwrap();
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..30 {
        let p = session.plan_random(&mut rng, &cfg.display).unwrap();
        assert_eq!(p.viewport.epoch, "2023");
        assert!(p.viewport.origin_x + p.viewport.width <= 3000);
        assert!(p.viewport.origin_y + p.viewport.height <= 2000);
    }
}

#[test]
fn full_canvas_plan_is_blank_from_first_rank() {
    let cfg = DatasetConfig::builtin();
    let session = PlaybackSession::new(&cfg, "2022", "data", "snaps").unwrap();
    let p = session.plan_full_canvas().unwrap();
    assert_eq!((p.viewport.width, p.viewport.height), (2000, 2000));
    assert_eq!((p.start_rank, p.seed), (100, Seed::Blank));
}

#[test]
fn plan_for_another_epoch_is_rejected() {
    let cfg = DatasetConfig::builtin();
    let s22 = PlaybackSession::new(&cfg, "2022", "data", "snaps").unwrap();
    let s23 = PlaybackSession::new(&cfg, "2023", "data", "snaps").unwrap();
    let plan = s23.plan_at(0, 0, DisplayScale::new(100.0).unwrap()).unwrap();
    let mut sink = InMemorySink::new();
    assert!(s22.play(&plan, &mut sink).is_err());
}

#[test]
fn play_starts_from_snapshot_stage() {
    let dir = temp_dir("session_seed");
    let cfg = tiny_config();
    let session = PlaybackSession::new(&cfg, "tiny", &dir, &dir).unwrap();

    let green = image::RgbImage::from_pixel(20, 10, image::Rgb([0, 200, 0]));
    green.save(dir.join("xBase.png")).unwrap();
    let layout = session.layout();
    std::fs::write(layout.ordered_path(100), line("01:00:00", "#0000FF", 12, 0)).unwrap();
    std::fs::write(layout.ordered_path(113), line("02:00:00", "#FF0000", 13, 1)).unwrap();

    // 800x600 display at scale 100 is an 8x6 viewport.
    let plan = session
        .plan_at(12, 0, DisplayScale::new(100.0).unwrap())
        .unwrap();
    assert_eq!(plan.start_rank, 113);

    let mut sink = InMemorySink::new();
    let stats = session.play(&plan, &mut sink).unwrap();
    assert_eq!(stats.shards_read, 1);
    assert_eq!(sink.frames.len(), 1);
    let frame = &sink.frames[0].1;
    assert_eq!((frame.width, frame.height), (8, 6));
    assert_eq!(frame.pixel(1, 1), Some(Rgb8::new(255, 0, 0)));
    assert_eq!(frame.pixel(0, 0), Some(Rgb8::new(0, 200, 0)));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn capture_saves_requested_ranks() {
    let dir = temp_dir("session_capture");
    let cfg = tiny_config();
    let session = PlaybackSession::new(&cfg, "tiny", &dir, &dir).unwrap();
    let layout = session.layout();
    std::fs::write(layout.ordered_path(100), line("01:00:00", "#FF0000", 3, 4)).unwrap();
    std::fs::write(layout.ordered_path(101), line("01:00:01", "#0000FF", 5, 6)).unwrap();
    std::fs::write(layout.ordered_path(102), line("01:00:02", "#0000FF", 7, 8)).unwrap();

    std::fs::write(layout.ordered_path(113), line("01:00:03", "#0000FF", 9, 9)).unwrap();
    std::fs::write(layout.ordered_path(114), line("01:00:04", "#0000FF", 9, 9)).unwrap();

    let out = dir.join("snaps");
    let captured = session.capture_snapshots([101, 113], &out).unwrap();
    assert_eq!(
        captured,
        vec![
            (101, out.join("tiny_101.png")),
            (113, out.join("xBase.png"))
        ]
    );

    let img = image::open(out.join("tiny_101.png")).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (20, 20));
    assert_eq!(img.get_pixel(3, 4).0, [255, 0, 0]);
    assert_eq!(img.get_pixel(5, 6).0, [255, 255, 255]);

    assert!(session.capture_snapshots(Vec::<u32>::new(), &out).unwrap().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}
