//! End-to-end compaction tests against on-disk git directories.
//!
//! Each test builds a git directory with loose objects and loose refs in a
//! temporary directory and runs the full pack-refs pass over it.

use std::fs;
use std::time::Duration;

use refpack_engine::{pack_refs, PackError, PackOptions};
use refpack_storage::{
    lockfile::lock_path_for, FileRefStore, GitObject, LockFile, LooseObjectStore, ObjectId,
    ObjectType, Reference, StorageError,
};
use tempfile::TempDir;

const AUTHOR: &str = "Alice <alice@example.com> 1234567890 +0000";

/// A throwaway git directory.
struct Repo {
    _dir: TempDir,
    refs: FileRefStore,
    objects: LooseObjectStore,
}

impl Repo {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let git_dir = dir.path().join(".git");
        fs::create_dir_all(git_dir.join("refs/heads")).unwrap();
        fs::create_dir_all(git_dir.join("refs/tags")).unwrap();
        fs::create_dir_all(git_dir.join("objects")).unwrap();
        fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").unwrap();

        Self {
            refs: FileRefStore::new(&git_dir),
            objects: LooseObjectStore::new(git_dir.join("objects")),
            _dir: dir,
        }
    }

    fn commit(&self, message: &str) -> ObjectId {
        let tree = self
            .objects
            .put(&GitObject::new(ObjectType::Tree, Vec::new()))
            .unwrap();
        self.objects
            .put(&GitObject::commit(&tree, &[], AUTHOR, AUTHOR, message))
            .unwrap()
    }

    fn tag(&self, target: &ObjectId, target_type: ObjectType, name: &str) -> ObjectId {
        self.objects
            .put(&GitObject::tag(target, target_type, name, AUTHOR, "release\n"))
            .unwrap()
    }

    fn set(&self, name: &str, target: ObjectId) {
        self.refs
            .write_loose(name, &Reference::Direct(target), Duration::ZERO)
            .unwrap();
    }

    fn loose(&self, name: &str) -> Option<Reference> {
        self.refs.read_loose(name).unwrap()
    }

    fn pack(&self, options: PackOptions) -> Result<refpack_engine::PackSummary, PackError> {
        pack_refs(&self.refs, &self.objects, options)
    }

    fn snapshot_text(&self) -> String {
        fs::read_to_string(self.refs.packed_refs_path()).unwrap()
    }
}

#[test]
fn test_scenario_tags_only() {
    let repo = Repo::new();
    let h1 = repo.commit("main");
    let h3 = repo.commit("release");
    let h2 = repo.tag(&h3, ObjectType::Commit, "v1");
    repo.set("refs/heads/main", h1);
    repo.set("refs/tags/v1", h2);

    repo.pack(PackOptions::new().with_all(false).with_prune(true)).unwrap();

    assert_eq!(
        repo.snapshot_text(),
        format!("# pack-refs with: peeled \n{h2} refs/tags/v1\n^{h3}\n")
    );
    assert_eq!(repo.loose("refs/heads/main"), Some(Reference::Direct(h1)));
    assert_eq!(repo.loose("refs/tags/v1"), None);
}

#[test]
fn test_scenario_pack_all() {
    let repo = Repo::new();
    let h1 = repo.commit("main");
    let h3 = repo.commit("release");
    let h2 = repo.tag(&h3, ObjectType::Commit, "v1");
    repo.set("refs/heads/main", h1);
    repo.set("refs/tags/v1", h2);

    let summary = repo
        .pack(PackOptions::new().with_all(true).with_prune(true))
        .unwrap();

    assert_eq!(
        repo.snapshot_text(),
        format!("# pack-refs with: peeled \n{h1} refs/heads/main\n{h2} refs/tags/v1\n^{h3}\n")
    );
    assert_eq!(summary.pruned, 2);
    assert_eq!(repo.loose("refs/heads/main"), None);
    assert_eq!(repo.loose("refs/tags/v1"), None);

    // The refs still resolve through the snapshot.
    let main = repo.refs.read_ref("refs/heads/main").unwrap().unwrap();
    assert!(main.packed);
    assert_eq!(main.target(), Some(h1));
}

#[test]
fn test_tag_chain_peels_to_final_object() {
    let repo = Repo::new();
    let o = repo.commit("target");
    let t2 = repo.tag(&o, ObjectType::Commit, "inner");
    let t1 = repo.tag(&t2, ObjectType::Tag, "outer");
    repo.set("refs/tags/outer", t1);

    repo.pack(PackOptions::new()).unwrap();

    let snapshot = repo.refs.read_packed().unwrap();
    let outer = snapshot.get("refs/tags/outer").unwrap();
    assert_eq!(outer.target, t1);
    assert_eq!(outer.peeled, Some(o));
}

#[test]
fn test_lightweight_tag_has_no_peeled_line() {
    let repo = Repo::new();
    let c = repo.commit("c");
    repo.set("refs/tags/light", c);

    repo.pack(PackOptions::new()).unwrap();

    assert_eq!(
        repo.snapshot_text(),
        format!("# pack-refs with: peeled \n{c} refs/tags/light\n")
    );
}

#[test]
fn test_second_run_is_idempotent() {
    let repo = Repo::new();
    let c = repo.commit("c");
    let t = repo.tag(&c, ObjectType::Commit, "v1");
    repo.set("refs/heads/main", c);
    repo.set("refs/heads/topic/a", c);
    repo.set("refs/tags/v1", t);

    let first = repo.pack(PackOptions::new().with_all(true)).unwrap();
    let snapshot = repo.snapshot_text();
    assert_eq!(first.pruned, 3);

    let second = repo.pack(PackOptions::new().with_all(true)).unwrap();
    assert_eq!(repo.snapshot_text(), snapshot);
    assert_eq!(second.packed, first.packed);
    assert_eq!(second.pruned, 0);
    assert_eq!(second.prune_skipped, 0);
}

#[test]
fn test_concurrent_compactor_fails_and_leaves_snapshot() {
    let repo = Repo::new();
    let c = repo.commit("c");
    repo.set("refs/tags/v1", c);
    repo.pack(PackOptions::new()).unwrap();
    let before = fs::read(repo.refs.packed_refs_path()).unwrap();

    repo.set("refs/tags/v2", c);
    let held = LockFile::acquire(repo.refs.packed_refs_path(), Duration::ZERO).unwrap();

    let err = repo
        .pack(PackOptions::new().with_commit_lock_timeout(Duration::from_millis(20)))
        .unwrap_err();
    assert!(matches!(err, PackError::Lock(StorageError::LockHeld { .. })));
    assert!(err.to_string().contains("packed-refs.lock"));

    drop(held);
    assert_eq!(fs::read(repo.refs.packed_refs_path()).unwrap(), before);
    assert!(repo.loose("refs/tags/v2").is_some());
}

#[test]
fn test_failed_run_leaves_snapshot_byte_identical() {
    let repo = Repo::new();
    let c = repo.commit("c");
    repo.set("refs/heads/main", c);
    repo.pack(PackOptions::new().with_all(true)).unwrap();
    let before = fs::read(repo.refs.packed_refs_path()).unwrap();

    // Several refs get written before the corrupt tag object is reached.
    for n in 0..10 {
        repo.set(&format!("refs/heads/b{n}"), c);
    }
    let corrupt = GitObject::new(ObjectType::Tag, b"no header here".to_vec());
    repo.objects.put(&corrupt).unwrap();
    repo.set("refs/tags/corrupt", corrupt.id);

    let err = repo.pack(PackOptions::new().with_all(true)).unwrap_err();
    assert!(matches!(err, PackError::Peel { .. }));
    assert!(err.to_string().contains("refs/tags/corrupt"));

    assert_eq!(fs::read(repo.refs.packed_refs_path()).unwrap(), before);
    assert!(!lock_path_for(&repo.refs.packed_refs_path()).exists());
    for n in 0..10 {
        assert!(repo.loose(&format!("refs/heads/b{n}")).is_some());
    }
}

#[test]
fn test_locked_ref_is_packed_but_not_pruned() {
    let repo = Repo::new();
    let c = repo.commit("c");
    repo.set("refs/heads/busy", c);
    repo.set("refs/heads/idle", c);

    let held = LockFile::acquire(repo.refs.loose_path("refs/heads/busy"), Duration::ZERO).unwrap();
    let summary = repo.pack(PackOptions::new().with_all(true)).unwrap();
    drop(held);

    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.prune_skipped, 1);
    assert!(repo.refs.read_packed().unwrap().get("refs/heads/busy").is_some());
    assert_eq!(repo.loose("refs/heads/busy"), Some(Reference::Direct(c)));
    assert_eq!(repo.loose("refs/heads/idle"), None);

    // The next run finishes the job.
    let summary = repo.pack(PackOptions::new().with_all(true)).unwrap();
    assert_eq!(summary.pruned, 1);
    assert_eq!(repo.loose("refs/heads/busy"), None);
}

#[test]
fn test_rerun_after_ref_moves_reflects_new_value() {
    let repo = Repo::new();
    let old = repo.commit("old");
    let new = repo.commit("new");
    repo.set("refs/heads/main", old);
    repo.pack(PackOptions::new().with_all(true).with_prune(false)).unwrap();

    // A writer moves the ref after it was packed but before it was pruned.
    repo.set("refs/heads/main", new);
    repo.pack(PackOptions::new().with_all(true)).unwrap();

    let snapshot = repo.refs.read_packed().unwrap();
    assert_eq!(snapshot.get("refs/heads/main").unwrap().target, new);
    assert_eq!(repo.loose("refs/heads/main"), None);
}

#[test]
fn test_symbolic_ref_survives_pack_all() {
    let repo = Repo::new();
    let c = repo.commit("c");
    repo.set("refs/remotes/origin/main", c);
    repo.refs
        .write_loose(
            "refs/remotes/origin/HEAD",
            &Reference::Symbolic("refs/remotes/origin/main".to_string()),
            Duration::ZERO,
        )
        .unwrap();

    repo.pack(PackOptions::new().with_all(true)).unwrap();

    assert!(!repo.snapshot_text().contains("refs/remotes/origin/HEAD"));
    assert_eq!(
        repo.loose("refs/remotes/origin/HEAD"),
        Some(Reference::Symbolic("refs/remotes/origin/main".to_string()))
    );
}

#[test]
fn test_empty_repository_gets_header_only_snapshot() {
    let repo = Repo::new();
    let summary = repo.pack(PackOptions::new()).unwrap();
    assert_eq!(summary, refpack_engine::PackSummary::default());
    assert_eq!(repo.snapshot_text(), "# pack-refs with: peeled \n");
}
