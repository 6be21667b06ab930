use shelf_pack_core::prelude::*;
use shelf_pack_core::{to_json_array, to_json_hash};

fn named(s: &str) -> BinId {
    BinId::Named(s.to_string())
}

#[test]
fn batch_places_in_input_order_and_writes_back() {
    let mut sprite = ShelfPack::with_size(64, 64);
    let mut requests = vec![
        PackRequest::new(12, 12).with_id(named("a")),
        PackRequest::new(12, 16).with_id(named("b")),
        PackRequest::new(12, 24).with_id(named("c")),
        PackRequest::new(10, 10),
    ];
    let results = sprite.pack(&mut requests, PackOptions { in_place: true });

    assert_eq!(results.len(), 4);
    let ids: Vec<String> = results.iter().map(|b| b.id.to_string()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "1"]);

    assert_eq!((requests[0].x, requests[0].y), (Some(0), Some(0)));
    assert_eq!((requests[1].x, requests[1].y), (Some(0), Some(12)));
    assert_eq!((requests[2].x, requests[2].y), (Some(0), Some(28)));
    // 10px tall goes on the 12px shelf (least height waste).
    assert_eq!((requests[3].x, requests[3].y), (Some(12), Some(0)));
    assert_eq!(requests[3].id, Some(BinId::from(1u32)));
}

#[test]
fn batch_without_in_place_leaves_requests_alone() {
    let mut sprite = ShelfPack::with_size(64, 64);
    let mut requests = vec![PackRequest::new(8, 8), PackRequest::new(8, 8)];
    let results = sprite.pack(&mut requests, PackOptions::default());
    assert_eq!(results.len(), 2);
    assert!(requests.iter().all(|r| r.x.is_none() && r.y.is_none() && r.id.is_none()));
}

#[test]
fn batch_skips_unplaceable_requests() {
    let mut sprite = ShelfPack::with_size(20, 20);
    let mut requests = vec![
        PackRequest::new(10, 10).with_id(named("a")),
        PackRequest::new(0, 10).with_id(named("zero")),
        PackRequest::new(30, 5).with_id(named("too-wide")),
        PackRequest::new(10, 10).with_id(named("b")),
    ];
    let results = sprite.pack(&mut requests, PackOptions { in_place: true });
    let ids: Vec<String> = results.iter().map(|b| b.id.to_string()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(requests[1].x.is_none());
    assert!(requests[2].x.is_none());
}

#[test]
fn batch_shrinks_atlas_to_used_bounds() {
    let cfg = ShelfPackConfig::builder()
        .with_dimensions(10, 10)
        .auto_resize(true)
        .build();
    let mut sprite = ShelfPack::new(cfg);
    let mut requests: Vec<PackRequest> = (0..5).map(|_| PackRequest::new(10, 10)).collect();
    let results = sprite.pack(&mut requests, PackOptions::default());
    assert_eq!(results.len(), 5);

    // Growth went 10x10 -> 20x10 -> 20x20 -> 40x20; the fifth bin fits the
    // widened first shelf, so the tight box is 30x20.
    assert_eq!((sprite.width(), sprite.height()), (30, 20));
    for bin in &results {
        assert!(bin.x + bin.w <= sprite.width());
        assert!(bin.y + bin.h <= sprite.height());
    }
    for shelf in sprite.shelves() {
        assert!(shelf.width() >= shelf.x());
    }

    // Growing again after a shrink widens shelves from the shrunk width.
    assert!(sprite.resize(64, 64));
    assert_eq!(sprite.shelves()[0].free(), 34);
}

#[test]
fn batch_on_empty_input_keeps_size() {
    let mut sprite = ShelfPack::with_size(64, 32);
    let results = sprite.pack(&mut [], PackOptions::default());
    assert!(results.is_empty());
    assert_eq!((sprite.width(), sprite.height()), (64, 32));
}

#[test]
fn fixed_atlas_after_shrink_uses_remaining_shelf_width() {
    let mut sprite = ShelfPack::with_size(64, 64);
    sprite.pack_one(10, 10, None).expect("a");
    sprite.pack_one(6, 12, None).expect("b");
    sprite.shrink();
    assert_eq!((sprite.width(), sprite.height()), (10, 22));
    assert!(matches!(
        sprite.pack_one(5, 4, None),
        Err(ShelfPackError::OutOfSpace)
    ));
    // The second shelf still has 4px of its shrunk width.
    let c = sprite.pack_one(4, 12, None).expect("c");
    assert_eq!((c.x, c.y), (6, 10));
}

#[test]
fn requests_deserialize_from_loose_json() {
    let mut requests: Vec<PackRequest> = serde_json::from_str(
        r#"[
            {"id": "a", "width": 12, "height": 12},
            {"id": 2, "w": 12, "h": 16},
            {"id": false, "w": 4, "h": 4},
            {"w": 4}
        ]"#,
    )
    .unwrap();
    let mut sprite = ShelfPack::with_size(64, 64);
    let results = sprite.pack(&mut requests, PackOptions { in_place: true });
    assert_eq!(results.len(), 3);
    assert_eq!(results[1].id, BinId::from(2u32));
    // Synthesized ids start past the explicit 2.
    assert_eq!(results[2].id, BinId::from(3u32));
    assert_eq!(requests[2].id, Some(BinId::from(3u32)));

    let out = serde_json::to_value(&requests[0]).unwrap();
    assert_eq!(out["id"], "a");
    assert_eq!(out["w"], 12);
    assert_eq!(out["x"], 0);
}

#[test]
fn stats_and_exports_reflect_live_bins() {
    let mut sprite = ShelfPack::with_size(32, 32);
    sprite.pack_one(16, 16, Some(named("a"))).expect("a");
    sprite.pack_one(16, 16, Some(named("b"))).expect("b");
    sprite.unref_bin(&named("b"));

    let stats = sprite.stats();
    assert_eq!(stats.num_bins, 1);
    assert_eq!(stats.num_free, 1);
    assert_eq!(stats.num_shelves, 1);
    assert_eq!(stats.total_area, 32 * 32);
    assert_eq!(stats.used_area, 16 * 16);
    assert!((stats.occupancy - 0.25).abs() < 1e-9);
    assert_eq!(stats.wasted_area(), 32 * 32 - 16 * 16);
    assert!((stats.waste_percentage() - 75.0).abs() < 1e-9);
    assert!(stats.summary().contains("Bins: 1"));

    let layout = sprite.snapshot();
    let arr = to_json_array(&layout);
    assert_eq!(arr["bins"].as_array().map(|a| a.len()), Some(1));
    let hash = to_json_hash(&layout);
    assert!(hash["bins"].get("a").is_some());
    assert!(hash["bins"].get("b").is_none());
}
