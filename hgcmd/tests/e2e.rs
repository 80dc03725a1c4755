//! End-to-end tests against a real `hg` executable.
//!
//! Every test returns early when Mercurial is not installed.

#![allow(clippy::unwrap_used, clippy::print_stderr, missing_docs)]

use std::fs;
use std::path::Path;
use std::process::Command;

use hgcmd::{
    Client, CloneOptions, CommitOptions, Config, LogOptions, PushOptions, Status, StatusOptions,
};

const USER: &str = "test <test@example.com>";

/// Config with user hgrc files ignored, or `None` if `hg` cannot run.
fn config() -> Option<Config> {
    let config = Config::from_env().env("HGRCPATH", "");
    let available = Command::new(config.executable())
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success());
    if !available {
        eprintln!("skipping: {} not available", config.executable().display());
        return None;
    }
    Some(config)
}

/// Creates a repository at `path` with `a.txt` committed once.
fn repo_with_commit(config: &Config, path: &Path) -> Client {
    Client::init(config, path).unwrap();
    fs::write(path.join("a.txt"), "qweqwe").unwrap();
    let client = Client::connect(config, path).unwrap();
    assert!(client.add(&["a.txt"]).unwrap());
    assert!(
        client
            .commit(&CommitOptions::new("first commit").user(USER))
            .unwrap()
    );
    client
}

#[test]
fn init_add_commit_cat_log() {
    let Some(config) = config() else { return };
    let dir = tempfile::tempdir().unwrap();
    let client = repo_with_commit(&config, dir.path());

    assert_eq!(client.cat("a.txt", None).unwrap(), "qweqwe");
    let revs = client.log(&LogOptions::new()).unwrap();
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].message, "first commit");
    assert_eq!(revs[0].author, "test");
    assert_eq!(revs[0].email, "test@example.com");
    assert_eq!(revs[0].node.len(), 40);
    assert!(revs[0].timestamp.is_some());

    assert!(
        !client
            .commit(&CommitOptions::new("nothing").user(USER))
            .unwrap()
    );
    client.close().unwrap();
}

#[test]
fn modified_file_status() {
    let Some(config) = config() else { return };
    let dir = tempfile::tempdir().unwrap();
    let client = repo_with_commit(&config, dir.path());

    fs::write(dir.path().join("a.txt"), "changed").unwrap();
    let status = client
        .status(&StatusOptions::new().files(["a.txt"]))
        .unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].path, "a.txt");
    assert_eq!(status[0].status, Status::Modified);
}

#[test]
fn clone_commit_push() {
    let Some(config) = config() else { return };
    let dir = tempfile::tempdir().unwrap();
    let parent_path = dir.path().join("parent");
    let child_path = dir.path().join("child");
    let parent = repo_with_commit(&config, &parent_path);

    Client::clone_repo(
        &config,
        parent_path.to_str().unwrap(),
        &child_path,
        &CloneOptions::new(),
    )
    .unwrap();
    let child = Client::connect(&config, &child_path).unwrap();
    fs::write(child_path.join("b.txt"), "second").unwrap();
    assert!(
        child
            .commit(&CommitOptions::new("second commit").addremove(true).user(USER))
            .unwrap()
    );

    let outgoing = child
        .outgoing(&hgcmd::RemoteLogOptions::new())
        .unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].message, "second commit");

    assert!(child.push(&PushOptions::new()).unwrap());
    assert_eq!(parent.log(&LogOptions::new()).unwrap().len(), 2);

    // Nothing left to push.
    assert!(!child.push(&PushOptions::new()).unwrap());
    assert!(
        child
            .outgoing(&hgcmd::RemoteLogOptions::new())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn connect_to_missing_repository_fails() {
    let Some(config) = config() else { return };
    let dir = tempfile::tempdir().unwrap();
    assert!(Client::connect(&config, dir.path().join("absent")).is_err());
}
