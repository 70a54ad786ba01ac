// Integration tests follow the organization suggested by Matklad:
// https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod connector_alternator;
mod connector_replicate_merge;
mod instance_stop;
mod oracle_queries;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Rendezvous delay used by the test connectors.
const DELAY: Duration = Duration::from_millis(40);
/// Time unit used by the test connectors.
const TIME_UNIT: Duration = Duration::from_millis(30);

/// Installs a test subscriber, configured with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
