//! # CLI - RODB Interactive Shell
//!
//! A REPL-style browser for a single RODB file. Reads commands from stdin,
//! resolves them against the loaded container, and prints results to stdout.
//! Works interactively or scripted (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! INFO          Print container header and sizes
//! TYPE path     Print the type of the node at path
//! SIZE path     Print element/entry count (1 for scalars)
//! GET path      Print a scalar, or a summary for arrays and maps
//! KEYS [path]   List the keys of a map in stored order
//! DUMP [path]   Print the subtree as YAML-like text
//! VERIFY        Run the full structural check
//! EXIT / QUIT   Leave the shell
//! ```
//!
//! A path is `/`-separated: inside an array a segment is an index, otherwise
//! it is a map key. An empty path names the root.
//!
//! ## Configuration
//!
//! ```text
//! RODB_PATH    File to open                       (default: "data.rodb")
//! RODB_VERIFY  Verify the whole tree on load      (default: "true")
//! RUST_LOG     tracing filter for stderr logging  (default: off)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ RODB_PATH=scene.rodb cargo run -p cli
//! RODB loaded (path=scene.rodb, bytes=412, verify=true)
//! > GET layers/0/name
//! ground
//! > KEYS layers/0
//! name
//! points
//! (2 keys)
//! > EXIT
//! bye
//! ```

mod shell;

use anyhow::{Context, Result};
use rodb::{Container, LoadOptions};
use shell::Command;
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn init_logging() {
    // Logs go to stderr so scripted stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let path = env_or("RODB_PATH", "data.rodb");
    let verify: bool = env_or("RODB_VERIFY", "true").parse().unwrap_or(true);

    let options = LoadOptions { verify };
    let db = Container::load_with(&path, &options)
        .with_context(|| format!("failed to load {}", path))?;
    info!(path = %path, bytes = db.len(), verify, "rodb shell started");

    println!(
        "RODB loaded (path={}, bytes={}, verify={})",
        path,
        db.len(),
        verify
    );
    println!("Commands: INFO | TYPE path | SIZE path | GET path | KEYS [path]");
    println!("          DUMP [path] | VERIFY | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let cmd = Command::parse(&line);
        debug!(?cmd, "command");
        if !shell::execute(&db, &cmd, &mut stdout)? {
            break;
        }

        print!("> ");
        stdout.flush().ok();
    }

    Ok(())
}
