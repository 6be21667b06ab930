use crate::error::Result;
use crate::model::{Bin, Layout};
use serde_json::{Value, json};
use std::path::Path;

fn meta(layout: &Layout) -> Value {
    json!({
        "app": "shelf-pack",
        "version": env!("CARGO_PKG_VERSION"),
        "size": {"w": layout.width, "h": layout.height},
        "autoResize": layout.auto_resize,
    })
}

fn bin_value(bin: &Bin) -> Value {
    json!({
        "x": bin.x,
        "y": bin.y,
        "w": bin.w,
        "h": bin.h,
        "maxw": bin.maxw,
        "maxh": bin.maxh,
        "refcount": bin.refcount,
    })
}

/// Serialize live bins as an array: `{ bins: [{ id, x, y, w, h, maxw, maxh, refcount }], stats, meta }`.
pub fn to_json_array(layout: &Layout) -> Value {
    let bins: Vec<Value> = layout
        .bins
        .iter()
        .map(|b| {
            let mut v = bin_value(b);
            v["id"] = json!(b.id);
            v
        })
        .collect();
    json!({ "bins": bins, "stats": layout.stats(), "meta": meta(layout) })
}

/// Live bins keyed by id: `{ bins: { id: { x, y, w, h, ... } }, stats, meta }`.
pub fn to_json_hash(layout: &Layout) -> Value {
    let mut bins = serde_json::Map::new();
    for b in &layout.bins {
        bins.insert(b.id.to_string(), bin_value(b));
    }
    json!({ "bins": bins, "stats": layout.stats(), "meta": meta(layout) })
}

/// Pretty-prints `value` to `path`.
pub fn write_json(path: impl AsRef<Path>, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    Ok(())
}
