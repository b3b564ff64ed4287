// tests/recall_tiers.rs
//! Tiered recall resolution across hot cache, archive, and DAG.

use engram_core::{Commands, Prefer, Tier};

fn open_tmp() -> (tempfile::TempDir, Commands) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cmd = Commands::open(dir.path()).expect("open workspace");
    (dir, cmd)
}

#[test]
fn remember_then_auto_recall_hits_hot() {
    let (_dir, cmd) = open_tmp();
    let id = cmd
        .remember("chat", Some("greeting"), "hello from the hot tier")
        .expect("remember");

    let hit = cmd.recall(&id, Prefer::Auto).expect("recall").expect("hit");
    assert_eq!(hit.tier, Tier::Hot);
    assert_eq!(hit.content, "hello from the hot tier");
    assert_eq!(hit.memory_id, id);
}

#[test]
fn remember_is_idempotent_per_key_and_content() {
    let (_dir, cmd) = open_tmp();
    let a = cmd.remember("chat", Some("k"), "same fact").expect("first");
    let b = cmd.remember("chat", Some("k"), "same fact").expect("second");
    assert_eq!(a, b);
    assert_eq!(cmd.stats(Some("chat")).expect("stats").total, 1);
}

#[test]
fn explicit_tier_preference_does_not_fall_back() {
    let (_dir, cmd) = open_tmp();
    let id = cmd.remember("chat", Some("k"), "hot only").expect("remember");

    // Present in hot, absent everywhere else.
    assert!(cmd.recall(&id, Prefer::Hot).expect("hot").is_some());
    assert!(cmd.recall(&id, Prefer::Archive).expect("archive").is_none());
    assert!(cmd.recall(&id, Prefer::Dag).expect("dag").is_none());
}

#[test]
fn demote_moves_content_to_colder_tiers() {
    let (_dir, cmd) = open_tmp();
    let id = cmd
        .remember("notes", Some("cold"), "gets demoted")
        .expect("remember");

    let cid = cmd.demote(&id).expect("demote").expect("cid");
    assert!(!cid.is_empty());

    // Hot row is gone; explicit hot recall misses.
    assert!(cmd.recall(&id, Prefer::Hot).expect("hot").is_none());

    // Archive still resolves via the standalone index.
    let hit = cmd
        .recall(&id, Prefer::Archive)
        .expect("archive")
        .expect("hit");
    assert_eq!(hit.tier, Tier::Archive);
    assert_eq!(hit.content, "gets demoted");

    // The DAG holds it under the lobe's branch.
    let hit = cmd.recall(&id, Prefer::Dag).expect("dag").expect("hit");
    assert_eq!(hit.tier, Tier::Dag);
    assert_eq!(hit.content, "gets demoted");

    // Auto resolves in tier order: archive comes before DAG once hot misses.
    let hit = cmd.recall(&id, Prefer::Auto).expect("auto").expect("hit");
    assert_eq!(hit.tier, Tier::Archive);
}

#[test]
fn promote_to_dag_binds_memory_id_to_snapshot() {
    let (_dir, cmd) = open_tmp();
    let id = cmd
        .remember("journal", Some("entry"), "promoted verbatim")
        .expect("remember");

    let hash = cmd.promote_to_dag(&id).expect("promote").expect("hash");

    // The lobe branch was extended with the row's content.
    let trace = cmd.trace("journal", None).expect("trace");
    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].hash, hash);
    assert_eq!(trace[0].content, "promoted verbatim");

    let hit = cmd.recall(&id, Prefer::Dag).expect("dag").expect("hit");
    assert_eq!(hit.content, "promoted verbatim");
}

#[test]
fn auto_recall_falls_through_to_dag() {
    let (_dir, cmd) = open_tmp();

    // Content living only in the DAG: no hot row, no archive blob.
    let node = cmd
        .store()
        .extend("journal", "dag only", "journal", "entry", serde_json::json!({}))
        .expect("extend");
    let fname = cmd
        .store()
        .filename_for_hash(&node.hash)
        .expect("lookup")
        .expect("indexed");
    cmd.store()
        .bind_id("journal_dagonly", &fname, "journal", "entry")
        .expect("bind");

    assert!(cmd
        .recall("journal_dagonly", Prefer::Hot)
        .expect("hot")
        .is_none());
    assert!(cmd
        .recall("journal_dagonly", Prefer::Archive)
        .expect("archive")
        .is_none());

    let hit = cmd
        .recall("journal_dagonly", Prefer::Auto)
        .expect("auto")
        .expect("hit");
    assert_eq!(hit.tier, Tier::Dag);
    assert_eq!(hit.content, "dag only");
}

#[test]
fn archive_rejects_blobs_that_inflate_past_the_cap() {
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    let dir = tempfile::tempdir().expect("tempdir");
    let archive = engram_core::services::Archive::open(dir.path()).expect("open");

    // Hand-place a small on-disk blob that expands to 64 MiB.
    let raw = vec![0u8; 64 * 1024 * 1024];
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&raw).expect("compress");
    let gz = enc.finish().expect("finish");
    assert!(gz.len() < 1024 * 1024, "bomb must be small on disk");
    std::fs::write(dir.path().join("bomb"), gz).expect("place blob");

    let err = archive.retrieve("bomb").expect_err("must reject");
    assert!(matches!(
        err,
        engram_core::MemoryError::CorruptRecord(_)
    ));

    // Ordinary blobs still round-trip.
    let cid = archive.store(b"small and fine").expect("store");
    assert_eq!(archive.retrieve(&cid).expect("retrieve"), b"small and fine");
}

#[test]
fn recall_many_preserves_input_order_and_marks_misses() {
    let (_dir, cmd) = open_tmp();
    let a = cmd.remember("chat", Some("a"), "alpha").expect("a");
    let b = cmd.remember("chat", Some("b"), "beta").expect("b");

    let out = cmd
        .recall_many(&[&b, "no_such_id", &a], Prefer::Auto)
        .expect("recall_many");
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].as_ref().map(|h| h.content.as_str()), Some("beta"));
    assert!(out[1].is_none());
    assert_eq!(out[2].as_ref().map(|h| h.content.as_str()), Some("alpha"));
}

#[test]
fn recall_unknown_id_is_none_not_error() {
    let (_dir, cmd) = open_tmp();
    assert!(cmd.recall("missing", Prefer::Auto).expect("recall").is_none());
}

#[test]
fn prefer_parse_is_lenient() {
    assert_eq!(Prefer::parse("HOT"), Prefer::Hot);
    assert_eq!(Prefer::parse("cold"), Prefer::Archive);
    assert_eq!(Prefer::parse("dag"), Prefer::Dag);
    assert_eq!(Prefer::parse("whatever"), Prefer::Auto);
}

#[test]
fn stats_counts_archived_rows() {
    let (_dir, cmd) = open_tmp();
    let a = cmd.remember("chat", Some("one"), "first").expect("a");
    cmd.remember("chat", Some("two"), "second").expect("b");

    cmd.promote_to_archive(&a).expect("promote");

    let stats = cmd.stats(Some("chat")).expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.archived, 1);
}

#[test]
fn recent_lists_hot_ids_for_lobe() {
    let (_dir, cmd) = open_tmp();
    let a = cmd.remember("chat", Some("a"), "alpha").expect("a");
    cmd.remember("other", Some("x"), "elsewhere").expect("x");

    let recent = cmd.recent("chat", 10).expect("recent");
    assert_eq!(recent, vec![a]);
}
