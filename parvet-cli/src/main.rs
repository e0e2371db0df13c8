use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use parvet_core::fileset::Fileset;
use parvet_core::localize::FluentLoc;
use parvet_core::progress::Progress;
use parvet_core::verify::{FileMatch, MatchError};

#[derive(Parser)]
#[command(name = "parvet", version, about = "parvet: PAR 2.0 block verification")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Inspect a parity description and list the files it covers
    Info {
        description: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Verify the files under a root directory against a parity description
    Verify {
        description: PathBuf,
        root: PathBuf,
        #[arg(long)]
        include: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Info { description, json } => info(&description, json),
        Cmd::Verify { description, root, include, exclude, json, progress } => {
            verify(&description, &root, &include, &exclude, json, progress)
        }
    }
}

fn load_fileset(path: &Path) -> Result<Fileset> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(Fileset::from_reader(f))
}

fn build_globset(
    includes: &[String],
    excludes: &[String],
) -> Result<(globset::GlobSet, globset::GlobSet)> {
    let mut incb = GlobSetBuilder::new();
    let mut excb = GlobSetBuilder::new();
    if includes.is_empty() {
        incb.add(Glob::new("**/*")?);
    }
    for g in includes {
        incb.add(Glob::new(g)?);
    }
    for g in excludes {
        excb.add(Glob::new(g)?);
    }
    Ok((incb.build()?, excb.build()?))
}

/// Candidate files under `root`, glob-filtered, description file skipped.
fn list_candidates(
    root: &Path,
    inc: &globset::GlobSet,
    exc: &globset::GlobSet,
    description: &Path,
) -> Result<Vec<PathBuf>> {
    let desc_abs = fs::canonicalize(description).unwrap_or_else(|_| description.to_path_buf());
    let mut v = vec![];
    for e in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let path = e.path();
        if !e.file_type().is_file() {
            continue;
        }
        if fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()) == desc_abs {
            continue;
        }
        let rp = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
        let rp_str = rp.to_string_lossy().replace('\\', "/");
        if !inc.is_match(&rp_str) {
            continue;
        }
        if !exc.is_match(&rp_str) {
            v.push(path.to_path_buf());
        }
    }
    v.sort();
    Ok(v)
}

fn rel_display(p: &Path) -> String {
    let rp = std::env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(p, cwd))
        .unwrap_or_else(|| p.to_path_buf());
    rp.to_string_lossy().replace('\\', "/")
}

fn info(description: &Path, json: bool) -> Result<()> {
    let fset = load_fileset(description)?;
    let summary = fset.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    let loc = FluentLoc::default();
    println!(
        "{}",
        loc.msg(
            "info-set",
            &[
                ("setid", &summary.set_id_hex),
                ("slice", &summary.slice_len.to_string()),
                ("files", &summary.files.len().to_string()),
            ],
        )
    );
    for f in &summary.files {
        let name = if f.name.is_empty() { "(unnamed)" } else { f.name.as_str() };
        println!("  {:40} {:>12} bytes  {:>8} blocks", name, f.length, f.block_count);
    }
    if !summary.complete {
        println!("{}", loc.msg("info-incomplete", &[]));
    }
    Ok(())
}

#[derive(Serialize)]
struct ReportFile {
    status: &'static str,
    name: Option<String>,
    path: Option<String>,
    blocks_total: usize,
    blocks_missing: usize,
    error: Option<String>,
}

#[derive(Serialize)]
struct Report {
    generated_utc: String,
    description: String,
    root: String,
    set_id_hex: String,
    slice_len: u64,
    blocks_needed: usize,
    files: Vec<ReportFile>,
}

fn report_file(fset: &Fileset, m: &FileMatch) -> ReportFile {
    let name = m.file_id.and_then(|id| fset.file(&id)).map(|f| f.name.clone());
    let blocks_total = m
        .file_id
        .and_then(|id| fset.file(&id))
        .map(|f| f.block_count(fset.slice_len()))
        .unwrap_or(0);
    let (status, blocks_missing, error): (&'static str, usize, Option<String>) = match &m.error {
        Some(e @ MatchError::Missing) => ("missing", blocks_total, Some(e.to_string())),
        Some(e @ MatchError::Open(_)) => ("open-error", 0, Some(e.to_string())),
        None => {
            let missing =
                m.blocks.as_ref().map(|b| b.missing_in(blocks_total)).unwrap_or(blocks_total);
            (if missing == 0 { "ok" } else { "damaged" }, missing, None)
        }
    };
    ReportFile {
        status,
        name,
        path: m.path.as_deref().map(rel_display),
        blocks_total,
        blocks_missing,
        error,
    }
}

fn print_match(loc: &FluentLoc, fset: &Fileset, m: &FileMatch) {
    let entry = m.file_id.and_then(|id| fset.file(&id));
    let name = entry.map(|f| f.name.as_str()).unwrap_or("?");
    let blocks = entry.map(|f| f.block_count(fset.slice_len())).unwrap_or(0);
    let line = match &m.error {
        Some(MatchError::Missing) => loc.msg(
            "verify-file-missing",
            &[("name", name), ("blocks", &blocks.to_string())],
        ),
        Some(MatchError::Open(e)) => {
            let path = m.path.as_deref().map(rel_display).unwrap_or_default();
            loc.msg("verify-open-error", &[("path", &path), ("error", &e.to_string())])
        }
        None => {
            let missing = m.blocks.as_ref().map(|b| b.missing_in(blocks)).unwrap_or(blocks);
            if missing == 0 {
                loc.msg("verify-file-ok", &[("name", name), ("blocks", &blocks.to_string())])
            } else {
                loc.msg(
                    "verify-file-damaged",
                    &[
                        ("name", name),
                        ("missing", &missing.to_string()),
                        ("blocks", &blocks.to_string()),
                    ],
                )
            }
        }
    };
    eprintln!("{line}");
}

fn verify(
    description: &Path,
    root: &Path,
    includes: &[String],
    excludes: &[String],
    json: bool,
    show_progress: bool,
) -> Result<()> {
    let fset = load_fileset(description)?;
    let loc = FluentLoc::default();
    if !fset.can_verify() {
        eprintln!("{}", loc.msg("info-incomplete", &[]));
        println!("BAD");
        return Ok(());
    }
    let (inc, exc) = build_globset(includes, excludes)?;
    let paths = list_candidates(root, &inc, &exc, description)?;

    let prog = Progress::new(show_progress);
    prog.set_stage("Verifying");
    prog.set_files_total(paths.len());
    let total_bytes: u64 = paths.iter().filter_map(|p| fs::metadata(p).ok()).map(|m| m.len()).sum();
    prog.reset_bytes(total_bytes as usize);
    prog.start();
    let (matches, blocks_needed) = fset.verify_with_progress(&paths, &prog);
    prog.stop();

    if json {
        let report = Report {
            generated_utc: chrono::Utc::now().to_rfc3339(),
            description: rel_display(description),
            root: rel_display(root),
            set_id_hex: fset.summary().set_id_hex,
            slice_len: fset.slice_len(),
            blocks_needed,
            files: matches.iter().map(|m| report_file(&fset, m)).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for m in &matches {
        print_match(&loc, &fset, m);
    }
    if blocks_needed == 0 {
        eprintln!("{}", loc.msg("verify-summary-ok", &[]));
        println!("OK");
    } else {
        eprintln!(
            "{}",
            loc.msg("verify-summary-damaged", &[("blocks", &blocks_needed.to_string())])
        );
        println!("BAD");
    }
    Ok(())
}
