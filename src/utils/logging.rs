use tracing_subscriber::EnvFilter;

/// Initialize tracing for the binary.
///
/// `default_level` is used unless `RUST_LOG` is set. Safe to call more than once.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn normalize_level(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(normalize_level("WARNING"), "warn");
        assert_eq!(normalize_level("Debug"), "debug");
        assert_eq!(normalize_level("verbose"), "info");
    }

    #[test]
    fn init_can_be_called_repeatedly() {
        init("info");
        init("debug");
    }
}
