//! Inputs of the business-specific tracking calls

use bitebase_domain::impl_domain_enum_conversions;

/// Progress through the restaurant onboarding wizard.
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantSetup {
    /// Restaurant name
    pub name: String,
    pub cuisine: String,
    pub latitude: f64,
    pub longitude: f64,
    pub setup_step: String,
}

/// A completed market analysis around a location.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketAnalysis {
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in meters
    pub radius: f64,
    /// Competitors found inside the radius
    pub competitor_count: u32,
    /// Score from 0 to 100
    pub opportunity_score: f64,
}

/// What the assistant was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiInteractionType {
    Chat,
    Recommendation,
    Analysis,
}

impl_domain_enum_conversions!(AiInteractionType {
    Chat => "chat",
    Recommendation => "recommendation",
    Analysis => "analysis",
});

/// One exchange with the AI assistant. Only the query length is tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct AiInteraction {
    pub kind: AiInteractionType,
    pub query: String,
    /// Time to the first answer
    pub response_time_ms: f64,
    /// User rating, when given
    pub satisfaction: Option<f64>,
}

/// Direction of a plan change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Subscribe,
    Upgrade,
    Downgrade,
    Cancel,
}

impl_domain_enum_conversions!(SubscriptionAction {
    Subscribe => "subscribe",
    Upgrade => "upgrade",
    Downgrade => "downgrade",
    Cancel => "cancel",
});

/// A plan change, tracked with its revenue
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionChange {
    pub plan: String,
    pub action: SubscriptionAction,
    /// Charged amount, reported as revenue
    pub amount: Option<f64>,
}
