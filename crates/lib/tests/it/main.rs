/*! Integration tests for keeper.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - codec: Flattening and decoding of realistic service configurations
 * - client: The KeeperClient surface over the in-memory store
 * - watch: Change watches, their handshake, filtering and shutdown
 * - transport: The HTTP transport against a mock keeper service
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("keeper=info".parse().unwrap()))
        .with_test_writer()
        .try_init();
}

mod client;
mod helpers;
#[cfg(feature = "http")]
mod transport;
mod watch;
