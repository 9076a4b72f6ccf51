//! Generates a `pub use` line for every dependency listed in this crate's manifest.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let manifest_path = manifest_dir.join("Cargo.toml");
    println!("cargo:rerun-if-changed={}", manifest_path.display());

    let manifest = cargo_toml::Manifest::from_slice(&fs::read(&manifest_path)?)?;
    let mut out = String::new();
    for name in manifest.dependencies.keys() {
        out.push_str(&format!("pub use {};\n", name.replace('-', "_")));
    }

    let out_path = PathBuf::from(env::var("OUT_DIR")?).join("deps.rs");
    fs::write(out_path, out)?;
    Ok(())
}
