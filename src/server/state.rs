use crate::aggregator::Aggregator;
use crate::alerts::CommunityAlertFeed;
use crate::location::LocationProvider;
use std::sync::Arc;

pub struct AppState {
    pub aggregator: Aggregator,
    pub alerts: CommunityAlertFeed,
    pub location: Arc<LocationProvider>,
}
