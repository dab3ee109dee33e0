pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = match option_env!("BUILD_COMMIT") {
    Some(c) => c,
    None => "unknown",
};

/// Version with the build commit, logged when the CLI starts.
pub fn version_string() -> String {
    format!("{} (commit: {})", VERSION, COMMIT)
}
