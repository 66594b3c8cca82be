use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=TYPELENS_GIT_HASH");

    // Packaged builds have no .git; let them pass the hash in
    if let Ok(hash) = std::env::var("TYPELENS_GIT_HASH") {
        println!("cargo:rustc-env=GIT_HASH={}", hash);
        return;
    }

    if Path::new(".git/HEAD").exists() {
        println!("cargo:rerun-if-changed=.git/HEAD");
        if let Some(reference) = std::fs::read_to_string(".git/HEAD")
            .ok()
            .and_then(|head| head.strip_prefix("ref: ").map(|r| r.trim().to_string()))
        {
            let ref_path = format!(".git/{}", reference);
            if Path::new(&ref_path).exists() {
                println!("cargo:rerun-if-changed={}", ref_path);
            }
        }
    }

    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
}
