//! Build automation for the Pyramid demo
//!
//! Usage:
//!   cargo xtask build-web        # WASM build plus page into dist/web
//!   cargo xtask package-web      # Zip dist/web for upload
//!   cargo xtask package-native   # Release binary plus assets into dist/native

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;

const BIN: &str = "pyramid-demo";
const MACROQUAD_JS: &str = "https://raw.githubusercontent.com/not-fl3/macroquad/v0.4.14/js/mq_js_bundle.js";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for the Pyramid demo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build WASM and a loader page into dist/web
    BuildWeb {
        /// Build without --release
        #[arg(long)]
        debug: bool,
    },
    /// Zip dist/web into dist/pyramid-web.zip
    PackageWeb,
    /// Build a native release into dist/native/<platform>
    PackageNative,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildWeb { debug } => build_web(debug),
        Commands::PackageWeb => package_web(),
        Commands::PackageNative => package_native(),
    }
}

fn project_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask has no parent directory")
}

/// Run a command and check for success
fn run_cmd(cmd: &mut Command) -> Result<()> {
    let status = cmd.status().context("Failed to execute command")?;
    if !status.success() {
        anyhow::bail!("Command failed with status: {}", status);
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Recreate `dir` empty
fn fresh_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn index_html() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Pyramid</title>
    <style>
        html, body, canvas {{ margin: 0; padding: 0; width: 100%; height: 100%; overflow: hidden; background: #5843c1; }}
    </style>
</head>
<body>
    <canvas id="glcanvas" tabindex="1"></canvas>
    <script src="mq_js_bundle.js"></script>
    <script>load("{BIN}.wasm");</script>
</body>
</html>
"#
    )
}

fn build_web(debug: bool) -> Result<()> {
    let root = project_root()?;
    let dist = root.join("dist/web");
    let profile = if debug { "debug" } else { "release" };

    println!("Building WASM ({})...", profile);
    let mut cargo = Command::new("cargo");
    cargo
        .current_dir(&root)
        .args(["build", "--bin", BIN, "--target", "wasm32-unknown-unknown"]);
    if !debug {
        cargo.arg("--release");
    }
    run_cmd(&mut cargo)?;

    fresh_dir(&dist)?;
    std::fs::copy(
        root.join(format!("target/wasm32-unknown-unknown/{}/{}.wasm", profile, BIN)),
        dist.join(format!("{}.wasm", BIN)),
    )?;
    std::fs::write(dist.join("index.html"), index_html())?;

    println!("Downloading {}...", MACROQUAD_JS);
    run_cmd(
        Command::new("curl")
            .args(["-L", "-o"])
            .arg(dist.join("mq_js_bundle.js"))
            .arg(MACROQUAD_JS),
    )?;

    copy_dir_recursive(&root.join("assets"), &dist.join("assets"))?;

    println!("Web build complete: dist/web/");
    Ok(())
}

fn package_web() -> Result<()> {
    build_web(false)?;

    let dist = project_root()?.join("dist");
    let zip_path = dist.join("pyramid-web.zip");
    if zip_path.exists() {
        std::fs::remove_file(&zip_path)?;
    }

    println!("Creating zip...");
    run_cmd(
        Command::new("zip")
            .current_dir(dist.join("web"))
            .args(["-r", "../pyramid-web.zip", "."]),
    )?;

    println!("Package ready: dist/pyramid-web.zip");
    Ok(())
}

fn package_native() -> Result<()> {
    let root = project_root()?;
    let platform = std::env::consts::OS;
    let dist = root.join("dist/native").join(platform);

    println!("Building native release for {}...", platform);
    run_cmd(
        Command::new("cargo")
            .current_dir(&root)
            .args(["build", "--release", "--bin", BIN]),
    )?;

    fresh_dir(&dist)?;
    let binary = format!("{}{}", BIN, std::env::consts::EXE_SUFFIX);
    std::fs::copy(root.join("target/release").join(&binary), dist.join(&binary))?;
    copy_dir_recursive(&root.join("assets"), &dist.join("assets"))?;

    println!("Native build complete: dist/native/{}/", platform);
    Ok(())
}
