use crate::error::FilestageResult;
// leading :: keeps these resolving to the tracing crate, not this module
pub use ::tracing::instrument;
pub use ::tracing::{debug, error, info, trace, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber: fmt output filtered by `RUST_LOG`, plus
/// an ErrorLayer so span traces can be captured into errors.
pub fn init_tracing() -> FilestageResult<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
