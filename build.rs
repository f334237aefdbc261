fn main() {
    // The report carries the commit it was produced by; "dev" when git is unavailable.
    let hash = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string());

    if let Some(hash) = hash {
        println!("cargo:rustc-env=GIT_HASH={hash}");
    }
}
