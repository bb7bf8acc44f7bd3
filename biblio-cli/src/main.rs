//! Thin CLI driver for the bibliographic article index store.
//!
//! Four subcommands, each taking exactly one argument, build and query
//! the on-disk store. Argument parsing itself guards arity; everything
//! else is delegated straight to `biblio-engine`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

/// Record file, siblings of the executable unless overridden.
const HASHFILE_NAME: &str = "bd-hashfile.bin";
/// Primary (id) index file name.
const ID_INDEX_NAME: &str = "bd-idtree.bin";
/// Secondary (title) index file name.
const TITLE_INDEX_NAME: &str = "bd-titletree.bin";

#[derive(Debug, Parser)]
#[command(author, version, about = "Bibliographic article index store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the record file and both indexes from a CSV dump.
    Upload {
        /// Path to the semicolon-delimited CSV input.
        csv_path: PathBuf,
    },
    /// Print the entry at the offset computed directly from an id.
    Findrec {
        /// Article identifier.
        id: i32,
    },
    /// Look up an id via the primary index, then fetch its entry.
    Seek1 {
        /// Article identifier.
        id: i32,
    },
    /// Look up a title via the secondary index, then fetch its entry.
    Seek2 {
        /// Article title. Shells must quote/escape spaces.
        title: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let store_dir = store_directory()?;
    let hashfile = store_dir.join(HASHFILE_NAME);
    let id_index = store_dir.join(ID_INDEX_NAME);
    let title_index = store_dir.join(TITLE_INDEX_NAME);

    match cli.command {
        Command::Upload { csv_path } => run_upload(&csv_path, &hashfile, &id_index, &title_index),
        Command::Findrec { id } => run_findrec(id, &hashfile),
        Command::Seek1 { id } => run_seek1(id, &id_index, &hashfile),
        Command::Seek2 { title } => run_seek2(&title, &title_index, &hashfile),
    }
}

/// The directory the index files live in: alongside the running
/// executable (§6).
fn store_directory() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

fn run_upload(csv_path: &Path, hashfile: &Path, id_index: &Path, title_index: &Path) -> Result<()> {
    match biblio_engine::ingest::upload(csv_path, hashfile, id_index, title_index) {
        Ok(summary) => {
            println!(
                "uploaded {} entries, record file holds {} blocks",
                summary.entries_written, summary.record_blocks
            );
            Ok(())
        }
        Err(err) => {
            error!(%err, "upload failed");
            println!("upload failed: {err}");
            Ok(())
        }
    }
}

fn run_findrec(id: i32, hashfile: &Path) -> Result<()> {
    if !hashfile.exists() {
        println!("no record file found, run `upload` first");
        return Ok(());
    }
    match biblio_engine::ingest::findrec(id, hashfile) {
        Ok(outcome) => {
            report(id.to_string(), outcome);
            Ok(())
        }
        Err(err) => {
            error!(%err, "findrec failed");
            println!("findrec failed: {err}");
            Ok(())
        }
    }
}

fn run_seek1(id: i32, id_index: &Path, hashfile: &Path) -> Result<()> {
    if !id_index.exists() || !hashfile.exists() {
        println!("no index found, run `upload` first");
        return Ok(());
    }
    match biblio_engine::ingest::seek1(id, id_index, hashfile) {
        Ok(outcome) => {
            report(id.to_string(), outcome);
            Ok(())
        }
        Err(err) => {
            error!(%err, "seek1 failed");
            println!("seek1 failed: {err}");
            Ok(())
        }
    }
}

fn run_seek2(title: &str, title_index: &Path, hashfile: &Path) -> Result<()> {
    if !title_index.exists() || !hashfile.exists() {
        println!("no index found, run `upload` first");
        return Ok(());
    }
    match biblio_engine::ingest::seek2(title, title_index, hashfile) {
        Ok(outcome) => {
            report(title.to_string(), outcome);
            Ok(())
        }
        Err(err) => {
            error!(%err, "seek2 failed");
            println!("seek2 failed: {err}");
            Ok(())
        }
    }
}

fn report(query: String, outcome: biblio_engine::ingest::QueryOutcome) {
    match outcome.entry {
        Some(entry) => {
            println!(
                "found id={} title=\"{}\" year={} citations={}",
                entry.id, entry.title, entry.year, entry.citations
            );
        }
        None => println!("not found: {query}"),
    }
    println!(
        "({} block{} read; file holds {} block{} total)",
        outcome.blocks_read,
        if outcome.blocks_read == 1 { "" } else { "s" },
        outcome.blocks_in_file,
        if outcome.blocks_in_file == 1 { "" } else { "s" },
    );
}
