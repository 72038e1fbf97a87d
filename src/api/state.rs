use crate::{model::config::PresenterConfig, service::monitoring::MonitoringService};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The monitoring service for reading and appending ledger records.
     */
    pub monitoring_service: MonitoringService,
    /**
     * Names shown on the entry page.
     */
    pub presenter: PresenterConfig,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `monitoring_service`: The monitoring service for reading and appending ledger records.
 * `presenter`: Names shown on the entry page.
 */
impl AppState {
    pub fn new(monitoring_service: MonitoringService, presenter: PresenterConfig) -> Self {
        AppState { monitoring_service, presenter }
    }
}
