use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

static DIR_NONCE: AtomicUsize = AtomicUsize::new(0);

/// Fresh, empty directory under the system temp dir.
pub fn temp_root(label: &str) -> PathBuf {
    let nonce = DIR_NONCE.fetch_add(1, Ordering::Relaxed);
    let root = std::env::temp_dir().join(format!(
        "flipbook-it-{label}-{}-{nonce}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).expect("create temp root");
    root
}

pub fn write_json(path: &Path, value: &serde_json::Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(path, serde_json::to_vec_pretty(value).expect("encode fixture"))
        .expect("write fixture");
}

/// `count` space-separated words `{prefix}0 {prefix}1 ...`.
pub fn words(prefix: &str, count: usize) -> String {
    (0..count)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Three-chapter site laid out like a published flipbook: metadata at the
/// root, chapter files under `content/`, the last one missing.
pub fn write_sample_site(root: &Path) {
    write_json(
        &root.join("book-metadata.json"),
        &json!({
            "title": "The Lantern Keeper",
            "author": "M. Harlow",
            "chapters": [
                { "id": 1, "title": "The Cove", "file": "content/chapter1.json" },
                { "id": 2, "title": "Night Watch", "file": "chapter2.json" },
                { "id": 3, "title": "Lost Pages", "file": "content/missing.json" }
            ]
        }),
    );
    write_json(
        &root.join("content/chapter1.json"),
        &json!({
            "title": "The Cove",
            "content": [
                "**Dawn.** The keeper climbed the *long* stair.",
                words("cove", 80)
            ]
        }),
    );
    write_json(
        &root.join("content/chapter2.json"),
        &json!({
            "title": "Night Watch",
            "content": [words("watch", 120), words("storm", 120), "_The end_ of the __watch__."]
        }),
    );
}
