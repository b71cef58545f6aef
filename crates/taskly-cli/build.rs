use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

struct GitInfo {
    sha: String,
    count: String,
    dirty: bool,
}

fn git_info() -> Option<GitInfo> {
    // Absolute, so the watch works from the crate directory and from worktrees.
    let git_dir = git(&["rev-parse", "--absolute-git-dir"])?;
    println!("cargo:rerun-if-changed={git_dir}/HEAD");
    println!("cargo:rerun-if-changed={git_dir}/index");

    let dirty = !Command::new("git")
        .args(["diff", "--quiet"])
        .status()
        .map(|status| status.success())
        .unwrap_or(true);
    Some(GitInfo {
        sha: git(&["rev-parse", "--short", "HEAD"])?,
        count: git(&["rev-list", "--count", "HEAD"]).unwrap_or_else(|| "0".to_string()),
        dirty,
    })
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let info = git_info().unwrap_or(GitInfo {
        sha: "nogit".to_string(),
        count: "0".to_string(),
        dirty: false,
    });
    println!("cargo:rustc-env=TASKLY_GIT_SHA={}", info.sha);
    println!("cargo:rustc-env=TASKLY_GIT_COUNT={}", info.count);
    println!(
        "cargo:rustc-env=TASKLY_GIT_DIRTY={}",
        if info.dirty { ".dirty" } else { "" }
    );
}
