use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "image_library=info";
const VERBOSE_LOG_FILTER: &str = "image_library=debug";

fn directives_for(verbose: bool, env_filter: Option<String>) -> String {
    if verbose {
        return VERBOSE_LOG_FILTER.to_string();
    }
    env_filter
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Installs the stderr subscriber. `IMGLIB_LOG` overrides the default filter
/// unless `--verbose` is given.
pub fn init(verbose: bool) {
    let directives = directives_for(verbose, std::env::var("IMGLIB_LOG").ok());
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(EnvFilter::new(directives)),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::directives_for;

    #[test]
    fn verbose_wins_over_environment() {
        assert_eq!(
            directives_for(true, Some("warn".to_string())),
            "image_library=debug"
        );
    }

    #[test]
    fn environment_filter_is_used_when_valid() {
        assert_eq!(directives_for(false, Some(" warn ".to_string())), "warn");
        assert_eq!(directives_for(false, None), "image_library=info");
        assert_eq!(
            directives_for(false, Some("  ".to_string())),
            "image_library=info"
        );
        assert_eq!(
            directives_for(false, Some("image_library=loud".to_string())),
            "image_library=info"
        );
    }
}
