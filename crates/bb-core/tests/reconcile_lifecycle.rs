use bb_core::classify::{classify, Tier};
use bb_core::collab::parse_records;
use bb_core::reconcile::reconcile;
use bb_core::{Cache, JobStatus};
use std::path::PathBuf;

fn fixture(name: &str) -> Cache {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name);
    let payload = std::fs::read(&path).expect("read fixture");
    parse_records("bjobs", &payload).expect("parse fixture")
}

fn ids(cache: &Cache) -> Vec<&str> {
    cache.keys().map(String::as_str).collect()
}

#[test]
fn finished_jobs_survive_an_empty_listing() {
    let mut cache = fixture("jobs_running_all.json");
    assert_eq!(ids(&cache), vec!["79913", "81061"]);

    let changed = reconcile(&mut cache, fixture("jobs_empty.json"));

    assert!(!changed);
    assert_eq!(ids(&cache), vec!["79913", "81061"]);
    assert!(cache
        .values()
        .all(|job| job.status == JobStatus::Running));
}

#[test]
fn exit_listing_moves_every_job_to_exited() {
    let mut cache = fixture("jobs_running_all.json");
    reconcile(&mut cache, fixture("jobs_empty.json"));

    assert!(reconcile(&mut cache, fixture("jobs_exit_all.json")));

    let board = classify(&cache);
    assert_eq!(board.counts.running, 0);
    assert_eq!(board.counts.exited, 2);
    assert!(board.rows.iter().all(|row| row.tier == Tier::Exited));
    assert_eq!(cache["81061"].exit_reason, "MEMLIMIT exceeded");
}

#[test]
fn completed_listing_then_silence_keeps_done_jobs() {
    let mut cache = fixture("jobs_running_all.json");
    assert!(reconcile(&mut cache, fixture("jobs_completed_all.json")));
    assert!(!reconcile(&mut cache, fixture("jobs_completed_all.json")));
    assert!(!reconcile(&mut cache, fixture("jobs_empty.json")));

    let board = classify(&cache);
    assert_eq!(board.counts.done, 2);
    assert_eq!(board.counts.running, 0);
    assert_eq!(board.rows.len(), 2);
    assert_eq!(board.rows[0].job.memory_usage(), "59G/488G");
}

#[test]
fn reconcile_never_drops_known_ids() {
    let snapshots = [
        "jobs_running_all.json",
        "jobs_empty.json",
        "jobs_exit_all.json",
        "jobs_completed_all.json",
        "jobs_empty.json",
    ];
    let mut cache = Cache::new();
    for name in snapshots {
        let before: Vec<String> = cache.keys().cloned().collect();
        reconcile(&mut cache, fixture(name));
        for id in before {
            assert!(cache.contains_key(&id), "{id} dropped after {name}");
        }
    }
    assert_eq!(cache.len(), 2);
}
