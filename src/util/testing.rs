//! Test support: one-time logging setup and category fixtures.

use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::CategoryRecord;

static TEST_SETUP: Once = Once::new();

/// Install the test logging subscriber once per test binary.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // Arena trace spans are too chatty for test output
    let noisy_targets = ["cattree::domain::arena"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_targets
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cattree=debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// The storefront catalog used across tests:
///
/// ```text
/// Women (2)          displayOrder 1
/// Men (1)            displayOrder 2
/// ├── Shoes (4)      displayOrder 1
/// │   └── Boots (5)
/// └── Shirts (3)     displayOrder 2
/// ```
pub fn sample_records() -> Vec<CategoryRecord> {
    vec![
        CategoryRecord::new("1", "Men").with_display_order(2),
        CategoryRecord::new("2", "Women").with_display_order(1),
        CategoryRecord::new("3", "Shirts")
            .with_parent("1")
            .with_display_order(2),
        CategoryRecord::new("4", "Shoes")
            .with_parent("1")
            .with_display_order(1),
        CategoryRecord::new("5", "Boots").with_parent("4"),
    ]
}

/// Write a category JSON fixture into `dir`.
pub fn write_fixture(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    std::fs::write(&path, json).unwrap_or_else(|e| panic!("write fixture {}: {}", name, e));
    path
}
