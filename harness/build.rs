use std::path::PathBuf;
use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    // The workspace lockfile is the resolved dependency set the binaries run with.
    let lockfile = manifest_dir.join("../Cargo.lock");
    let embedded = out_dir.join("Cargo.lock");
    if lockfile.exists() {
        std::fs::copy(&lockfile, &embedded)?;
    } else {
        println!(
            "cargo:warning=Lockfile not found at {}, embedding an empty dependency set",
            lockfile.display()
        );
        std::fs::write(&embedded, b"")?;
    }
    println!("cargo:rerun-if-changed={}", lockfile.display());

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(&rustc)
        .arg("-V")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=ARCHIVAL_RUSTC_VERSION={version}");
    println!("cargo:rerun-if-env-changed=RUSTC");

    Ok(())
}
