//! Build script for the playrelay binary.
//!
//! Copies `.env.example` next to where `config::load_env` looks for the
//! user's `.env` (`<data_local_dir>/playrelay/`), so a fresh install has a
//! template to start from. A missing template only produces a warning.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let template = manifest_dir.join(".env.example");

    if !template.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            template.display()
        );
        return Ok(());
    }

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("playrelay");
    // Best effort: sandboxed builds may not be allowed to write there.
    if fs::create_dir_all(&out_dir).is_ok() {
        if let Err(e) = fs::copy(&template, out_dir.join(".env.example")) {
            println!("cargo:warning=could not copy .env.example: {e}");
        }
    }

    Ok(())
}
