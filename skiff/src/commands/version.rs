/// Get the version string for skiff and libskiff
pub fn get_version_string() -> String {
    format!(
        "skiff {}\nlibskiff {}",
        env!("CARGO_PKG_VERSION"),
        libskiff::version()
    )
}

/// Print version information to stdout
pub fn print_version() {
    println!("{}", get_version_string());
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
