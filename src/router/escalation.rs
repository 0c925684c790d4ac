use serde::Serialize;

use crate::core::config::RoutingSettings;
use crate::handlers::HandlerKind;

/// Confidence-based fallback between handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscalationPolicy {
    /// Responses strictly below this confidence are escalated.
    pub threshold: f32,
    pub fallback: HandlerKind,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            fallback: HandlerKind::LiveSearch,
        }
    }
}

impl From<&RoutingSettings> for EscalationPolicy {
    fn from(settings: &RoutingSettings) -> Self {
        Self {
            threshold: settings.escalation_threshold,
            fallback: settings.fallback_handler,
        }
    }
}

impl EscalationPolicy {
    /// Handler to re-invoke, if any. A handler never escalates to itself.
    pub fn fallback_for(
        &self,
        primary: HandlerKind,
        confidence: f32,
        threshold: f32,
    ) -> Option<HandlerKind> {
        if primary == self.fallback || confidence >= threshold {
            return None;
        }
        Some(self.fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EscalationRecord {
    pub from: HandlerKind,
    pub to: HandlerKind,
    pub primary_confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_confidence_escalates_to_fallback() {
        let policy = EscalationPolicy::default();
        assert_eq!(
            policy.fallback_for(HandlerKind::KnowledgeBase, 0.3, 0.5),
            Some(HandlerKind::LiveSearch)
        );
        assert_eq!(
            policy.fallback_for(HandlerKind::StructuredData, 0.2, 0.5),
            Some(HandlerKind::LiveSearch)
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.fallback_for(HandlerKind::KnowledgeBase, 0.5, 0.5), None);
        assert_eq!(policy.fallback_for(HandlerKind::KnowledgeBase, 0.8, 0.5), None);
    }

    #[test]
    fn fallback_never_escalates_to_itself() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.fallback_for(HandlerKind::LiveSearch, 0.0, 0.5), None);
    }

    #[test]
    fn policy_follows_routing_settings() {
        let settings = RoutingSettings {
            escalation_threshold: 0.25,
            fallback_handler: HandlerKind::KnowledgeBase,
        };
        let policy = EscalationPolicy::from(&settings);
        assert_eq!(policy.threshold, 0.25);
        assert_eq!(policy.fallback_for(HandlerKind::KnowledgeBase, 0.0, 0.25), None);
        assert_eq!(
            policy.fallback_for(HandlerKind::LiveSearch, 0.1, 0.25),
            Some(HandlerKind::KnowledgeBase)
        );
    }
}
