//! Identity resolution
//!
//! Asks a backend for the open record matching a test identity. Finding
//! nothing is a normal outcome; a rejected query is a resolver defect and is
//! logged at error severity before being surfaced.

use tracing::{debug, error};

use relay_common::{Result, TestIdentity, TrackedRecord};
use relay_trackers::TrackerAdapter;

/// Resolve the open record for `identity` on one backend.
pub async fn resolve(
    identity: &TestIdentity,
    adapter: &dyn TrackerAdapter,
) -> Result<Option<TrackedRecord>> {
    match adapter.find_open_record(identity).await {
        Ok(Some(record)) => {
            debug!(
                "{} record {} is open in '{}' for {}",
                adapter.backend(),
                record.external_id,
                record.lane_or_status,
                identity
            );
            Ok(Some(record))
        }
        Ok(None) => {
            debug!("no open {} record for {}", adapter.backend(), identity);
            Ok(None)
        }
        Err(err) if err.is_query() => {
            error!(
                "{} rejected the dedup query for {} (resolver defect): {}",
                adapter.backend(),
                identity,
                err
            );
            Err(err)
        }
        Err(err) => Err(err),
    }
}
