//! Product analytics
//!
//! [`AnalyticsService`] enriches events and fans them out to every
//! configured [`AnalyticsClient`].

pub mod events;
pub mod ports;
pub mod service;

pub use events::{
    AiInteraction, AiInteractionType, MarketAnalysis, RestaurantSetup, SubscriptionAction,
    SubscriptionChange,
};
pub use ports::AnalyticsClient;
pub use service::AnalyticsService;
