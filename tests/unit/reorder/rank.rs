use super::*;
use crate::config::dataset::DatasetConfig;

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

fn raw(index: u32, path: &str) -> RawShard {
    RawShard {
        index,
        path: PathBuf::from(path),
    }
}

#[test]
fn plan_ranks_orders_by_key_from_first_rank() {
    let (ranked, collisions) = plan_ranks(vec![(50, raw(0, "a")), (-3, raw(1, "b")), (7, raw(2, "c"))]);
    let order: Vec<(u32, i64, u32)> = ranked.iter().map(|(r, k, s)| (*r, *k, s.index)).collect();
    assert_eq!(order, vec![(100, -3, 1), (101, 7, 2), (102, 50, 0)]);
    assert!(collisions.is_empty());
}

#[test]
fn plan_ranks_overwrites_colliding_key() {
    let (ranked, collisions) = plan_ranks(vec![(10, raw(0, "first")), (10, raw(1, "second"))]);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].2.index, 1);
    assert_eq!(
        collisions,
        vec![RankCollision {
            key: 10,
            kept: PathBuf::from("second"),
            dropped: PathBuf::from("first"),
        }]
    );
    assert!(matches!(
        collisions[0].to_error(),
        PlaceError::ShardRankCollision { key: 10, .. }
    ));
}

#[test]
fn first_event_key_skips_unparseable_prefix() {
    let dir = temp_dir("first_key");
    let path = dir.join("shard.csv");
    std::fs::write(
        &path,
        "timestamp,user_id,pixel_color,coordinate\n\
         2022-04-01 00:44:10.5 UTC,u,#000000,\"1,1\"\n\
         2022-04-01 00:44:05 UTC,u,#000000,\"1,1\"\n",
    )
    .unwrap();
    let schema = RecordSchema::place_2022();
    assert_eq!(
        first_event_key(&schema, &path, 1_648_773_840).unwrap(),
        Some(10)
    );

    let empty = dir.join("empty.csv");
    std::fs::write(&empty, "garbage\n").unwrap();
    assert_eq!(first_event_key(&schema, &empty, 0).unwrap(), None);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn rank_shards_renames_by_first_timestamp() {
    let dir = temp_dir("rank_rename");
    let cfg = DatasetConfig::builtin();
    let epoch = cfg.epoch("2022").unwrap();
    let layout = ShardLayout::for_epoch(&dir, epoch);

    let contents = [
        "2022-04-01 02:00:00.1 UTC,u,#000000,\"1,1\"\n",
        "2022-04-01 01:00:00 UTC,u,#000000,\"2,2\"\n",
        "2022-04-01 03:00:00.25 UTC,u,#000000,\"3,3\"\n",
    ];
    let mut shards = Vec::new();
    for (i, body) in contents.iter().enumerate() {
        let path = layout.raw_path(i as u32);
        std::fs::write(&path, body).unwrap();
        shards.push(RawShard {
            index: i as u32,
            path,
        });
    }

    let report = rank_shards(epoch, &layout, &shards).unwrap();
    let ranks: Vec<(u32, u32)> = report
        .assignments
        .iter()
        .map(|a| (a.rank, a.source.index))
        .collect();
    assert_eq!(ranks, vec![(100, 1), (101, 0), (102, 2)]);
    assert_eq!(
        std::fs::read_to_string(layout.ranked_path(100)).unwrap(),
        contents[1]
    );
    assert!(!layout.raw_path(1).exists());
    report.ensure_no_collisions().unwrap();
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn rank_shards_survives_same_second_collision() {
    let dir = temp_dir("rank_collision");
    let cfg = DatasetConfig::builtin();
    let epoch = cfg.epoch("2022").unwrap();
    let layout = ShardLayout::for_epoch(&dir, epoch);

    let a = layout.raw_path(0);
    let b = layout.raw_path(1);
    std::fs::write(&a, "2022-04-01 01:00:00.100 UTC,u,#000000,\"1,1\"\n").unwrap();
    std::fs::write(&b, "2022-04-01 01:00:00.900 UTC,u,#FFFFFF,\"2,2\"\n").unwrap();
    let shards = vec![
        RawShard {
            index: 0,
            path: a.clone(),
        },
        RawShard {
            index: 1,
            path: b.clone(),
        },
    ];

    let report = rank_shards(epoch, &layout, &shards).unwrap();
    assert_eq!(report.assignments.len(), 1);
    assert_eq!(report.assignments[0].source.index, 1);
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].dropped, a);
    assert!(report.ensure_no_collisions().is_err());
    // The overwritten shard stays under its raw name.
    assert!(a.exists());
    assert!(layout.ranked_path(100).exists());
    assert!(!layout.ranked_path(101).exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn source_index_ordering_skips_timestamps() {
    let dir = temp_dir("rank_source_index");
    let cfg = DatasetConfig::builtin();
    let epoch = cfg.epoch("2023").unwrap();
    let layout = ShardLayout::for_epoch(&dir, epoch);
    let path = layout.raw_path(4);
    std::fs::write(&path, "not even a record\n").unwrap();

    let report = rank_shards(epoch, &layout, &[RawShard { index: 4, path }]).unwrap();
    assert_eq!(report.assignments[0].rank, 104);
    assert_eq!(report.assignments[0].key, None);
    assert!(layout.ranked_path(104).exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn rank_shards_refuses_rank_with_existing_ordered_shard() {
    let dir = temp_dir("rank_occupied");
    let cfg = DatasetConfig::builtin();
    let epoch = cfg.epoch("2022").unwrap();
    let layout = ShardLayout::for_epoch(&dir, epoch);

    let ordered = "2022-04-01 01:00:00 UTC,u,#000000,\"9,9\"\n";
    std::fs::write(layout.ordered_path(100), ordered).unwrap();
    let a = layout.raw_path(0);
    let b = layout.raw_path(1);
    std::fs::write(&a, "2022-04-01 01:00:00.5 UTC,u,#000000,\"1,1\"\n").unwrap();
    std::fs::write(&b, "2022-04-01 02:00:00 UTC,u,#000000,\"2,2\"\n").unwrap();
    let shards = vec![
        RawShard {
            index: 0,
            path: a.clone(),
        },
        RawShard {
            index: 1,
            path: b.clone(),
        },
    ];

    let err = rank_shards(epoch, &layout, &shards).unwrap_err();
    assert!(matches!(err, PlaceError::Validation(_)));
    // Nothing moved: not even the shard whose rank was free.
    assert!(a.exists());
    assert!(b.exists());
    assert!(!layout.ranked_path(101).exists());
    assert_eq!(
        std::fs::read_to_string(layout.ordered_path(100)).unwrap(),
        ordered
    );
    std::fs::remove_dir_all(&dir).ok();
}
