//! Analytics vendor clients

pub mod google;
pub mod mixpanel;

pub use google::GoogleAnalyticsClient;
pub use mixpanel::MixpanelClient;
