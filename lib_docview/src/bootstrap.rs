//! # Bootstrap
//!
//! Builds the process-wide [`Framework`] from [`DocviewSettings`]: the `ajax`
//! utility over the configured transport, the `browser` utility, the page
//! data providers and the `page-img` component.

use std::sync::Arc;

use crate::components::register_components;
use crate::configs::DocviewSettings;
use crate::core::registry::Framework;
use crate::providers::register_page_providers;
use crate::retrieve::{Ajax, HttpTransport, Transport, TransportSetupError, AJAX_UTILITY};
use crate::utils::browser::BROWSER_UTILITY;

impl Framework {
    /// A framework wired to the reqwest transport described by `settings`.
    pub fn bootstrap(settings: &DocviewSettings) -> Result<Arc<Framework>, TransportSetupError> {
        let transport = HttpTransport::from_config(&settings.transport)?;
        Self::bootstrap_with_transport(settings, Arc::new(transport))
    }

    /// A framework wired to a caller-supplied transport.
    pub fn bootstrap_with_transport(
        settings: &DocviewSettings,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Framework>, TransportSetupError> {
        let (min, max) = settings.transport.retry_bounds();
        let ajax = Ajax::new(transport)
            .with_origin(settings.transport.origin_url()?)
            .with_retry_bounds(min, max);
        let browser = settings.browser;

        let framework = Framework::new();
        framework.add_utility(AJAX_UTILITY, move |_| ajax.clone());
        framework.add_utility(BROWSER_UTILITY, move |_| browser);
        register_page_providers(&framework);
        register_components(&framework);

        log::info!(
            "Framework ready (origin: {}, offline: {})",
            settings.transport.origin.as_deref().unwrap_or("none"),
            settings.transport.offline
        );
        Ok(Arc::new(framework))
    }
}
