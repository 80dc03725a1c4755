//! Mercurial client over the command server protocol.
//!
//! `hgcmd` keeps one `hg serve --cmdserver pipe` process per repository
//! and runs every command through it, instead of spawning `hg` per call.
//! Results come back as plain records ([`Revision`], [`FileStatus`],
//! [`CommandResult`]).
//!
//! # Quick start
//!
//! ```no_run
//! use hgcmd::{Client, Config, StatusOptions};
//!
//! let config = Config::from_env();
//! let client = Client::connect(&config, "/path/to/repo")?;
//! for entry in client.status(&StatusOptions::new())? {
//!     println!("{} {}", entry.status, entry.path);
//! }
//! client.close()?;
//! # Ok::<(), hgcmd::Error>(())
//! ```
//!
//! # Layers
//!
//! - [`Client`]: typed operations (`commit`, `log`, `push`, ...).
//! - [`Session`]: server process lifecycle and handshake.
//! - [`Executor`]: one serialized request/response cycle at a time.
//! - [`hgcmd_proto`]: frame encoding.

mod args;
mod client;
mod config;
mod error;
mod executor;
mod options;
mod session;
mod status;
mod xml;

pub use args::{Args, DATE_FORMAT};
pub use client::{Client, Repository};
pub use config::{Config, ENV_EXECUTABLE};
pub use error::{Error, Result};
pub use executor::{CommandResult, Executor};
pub use hgcmd_proto::Channel;
pub use options::{
    ArchiveOptions, CloneOptions, CommitOptions, HeadsOptions, LogOptions, MergeOptions,
    PullOptions, PushOptions, RemoteLogOptions, ResolveOptions, StatusOptions, UpdateOptions,
};
pub use session::{Handshake, Session};
pub use status::{FileStatus, ResolveEntry, Status, parse_paths, parse_resolve, parse_status};
pub use xml::{Revision, parse_revisions, parse_revisions_after_marker};
