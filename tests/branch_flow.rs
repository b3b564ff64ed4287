// tests/branch_flow.rs
//! End-to-end branch lifecycle: extend, diverge, trace, consolidate, LCA.

use engram_core::errors::MemoryError;
use engram_core::Commands;

fn open_tmp() -> (tempfile::TempDir, Commands) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cmd = Commands::open(dir.path()).expect("open workspace");
    (dir, cmd)
}

#[test]
fn extend_seeds_branch_and_trace_is_newest_first() {
    let (_dir, cmd) = open_tmp();

    let b0 = cmd.extend("main", "base", None).expect("seed");
    let s1 = cmd.extend("main", "first", None).expect("first");
    let s2 = cmd.extend("main", "second", None).expect("second");

    let trace = cmd.trace("main", None).expect("trace");
    assert_eq!(trace.len(), 3);
    assert_eq!(trace[0].hash, s2.hash);
    assert_eq!(trace[1].hash, s1.hash);
    assert_eq!(trace[2].hash, b0.hash);
    assert!(trace[2].parent.is_none(), "oldest node is the root");

    assert_eq!(cmd.head("main").expect("head"), Some(s2.hash));
}

#[test]
fn trace_respects_limit() {
    let (_dir, cmd) = open_tmp();
    for i in 0..6 {
        cmd.extend("long", &format!("step {i}"), None).expect("extend");
    }
    let t = cmd.trace("long", Some(4)).expect("trace");
    assert_eq!(t.len(), 4);
    assert_eq!(t[0].content, "step 5");
}

#[test]
fn diverge_then_extend_then_trace() {
    let (_dir, cmd) = open_tmp();

    let b0 = cmd.extend("main", "shared base", None).expect("seed");
    cmd.diverge(&b0.hash, "sketch").expect("diverge");

    let s1 = cmd.extend("sketch", "idea one", None).expect("s1");
    let s2 = cmd.extend("sketch", "idea two", None).expect("s2");

    let t = cmd.trace("sketch", None).expect("trace");
    let hashes: Vec<&str> = t.iter().map(|n| n.hash.as_str()).collect();
    assert_eq!(hashes, vec![s2.hash.as_str(), s1.hash.as_str(), b0.hash.as_str()]);

    // Main is untouched by the side branch.
    assert_eq!(cmd.head("main").expect("head"), Some(b0.hash));
}

#[test]
fn diverge_rejects_duplicate_name() {
    let (_dir, cmd) = open_tmp();
    let b0 = cmd.extend("main", "base", None).expect("seed");
    cmd.diverge(&b0.hash, "twin").expect("first diverge");
    let err = cmd.diverge(&b0.hash, "twin").expect_err("second diverge must fail");
    assert!(matches!(err, MemoryError::DuplicateBranch(_)));
}

#[test]
fn diverge_collision_recovers_with_a_fresh_name() {
    use rand::Rng;

    let (_dir, cmd) = open_tmp();
    let b0 = cmd.extend("main", "base", None).expect("seed");
    cmd.diverge(&b0.hash, "twin").expect("first diverge");
    let err = cmd.diverge(&b0.hash, "twin").expect_err("collision");
    assert!(matches!(err, MemoryError::DuplicateBranch(_)));

    // The caller-side recovery: retry under a fresh unique name.
    let fresh = format!("twin_{:04x}", rand::thread_rng().gen::<u16>());
    let r = cmd.diverge(&b0.hash, &fresh).expect("retry with fresh name");
    assert_eq!(r.base_hash, b0.hash);
    assert_eq!(cmd.head(&fresh).expect("head"), Some(b0.hash));
}

#[test]
fn diverge_from_unknown_snapshot_is_not_found() {
    let (_dir, cmd) = open_tmp();
    let err = cmd
        .diverge("0000000000000000000000000000000000000000000000000000000000000000", "ghost")
        .expect_err("unknown base");
    assert!(err.is_not_found());
}

#[test]
fn lca_of_siblings_is_their_fork_point() {
    let (_dir, cmd) = open_tmp();

    cmd.extend("main", "one", None).expect("one");
    let fork = cmd.extend("main", "two", None).expect("two");
    cmd.diverge(&fork.hash, "left").expect("left");
    cmd.diverge(&fork.hash, "right").expect("right");
    cmd.extend("left", "l1", None).expect("l1");
    cmd.extend("right", "r1", None).expect("r1");
    cmd.extend("right", "r2", None).expect("r2");

    let lca = cmd
        .lowest_common_ancestor("left", "right", None)
        .expect("lca");
    assert_eq!(lca, Some(fork.hash));
}

#[test]
fn lca_of_unrelated_branches_is_none() {
    let (_dir, cmd) = open_tmp();
    cmd.extend("alpha", "a", None).expect("a");
    cmd.extend("beta", "b", None).expect("b");
    let lca = cmd
        .lowest_common_ancestor("alpha", "beta", None)
        .expect("lca");
    assert_eq!(lca, None);
}

#[test]
fn consolidate_fast_forwards_when_dst_is_ancestor() {
    let (_dir, cmd) = open_tmp();

    let base = cmd.extend("main", "base", None).expect("seed");
    cmd.diverge(&base.hash, "work").expect("diverge");
    cmd.extend("work", "w1", None).expect("w1");
    let tip = cmd.extend("work", "w2", None).expect("w2");

    let head = cmd.consolidate("work", "main").expect("consolidate");
    assert_eq!(head, tip.hash);
    assert_eq!(cmd.head("main").expect("head"), Some(tip.hash));
}

#[test]
fn consolidate_refuses_diverged_dst_and_mutates_nothing() {
    let (_dir, cmd) = open_tmp();

    let base = cmd.extend("main", "base", None).expect("seed");
    cmd.diverge(&base.hash, "work").expect("diverge");
    cmd.extend("work", "w1", None).expect("w1");
    // Main moves on its own; heads have diverged.
    let main_tip = cmd.extend("main", "m1", None).expect("m1");

    let err = cmd.consolidate("work", "main").expect_err("must refuse");
    assert!(matches!(err, MemoryError::NotFastForwardable { .. }));
    assert_eq!(cmd.head("main").expect("head"), Some(main_tip.hash));
}

#[test]
fn consolidate_into_missing_dst_creates_it_at_src_head() {
    let (_dir, cmd) = open_tmp();
    let tip = cmd.extend("work", "only", None).expect("seed");
    let head = cmd.consolidate("work", "fresh").expect("consolidate");
    assert_eq!(head, tip.hash);
    assert_eq!(cmd.head("fresh").expect("head"), Some(tip.hash));
}

#[test]
fn consolidate_equal_heads_is_a_no_op() {
    let (_dir, cmd) = open_tmp();
    let base = cmd.extend("main", "base", None).expect("seed");
    cmd.diverge(&base.hash, "mirror").expect("diverge");
    let head = cmd.consolidate("mirror", "main").expect("consolidate");
    assert_eq!(head, base.hash);
}

#[test]
fn extend_meta_sets_lobe_and_key() {
    let (_dir, cmd) = open_tmp();
    let node = cmd
        .extend(
            "main",
            "tagged",
            Some(serde_json::json!({ "lobe": "reflections", "key": "daily" })),
        )
        .expect("extend");
    assert_eq!(node.lobe, "reflections");
    assert_eq!(node.key, "daily");
}
