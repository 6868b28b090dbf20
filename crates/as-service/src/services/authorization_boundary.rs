use crate::models::AccessToken;
use common::scope;

/// Decides whether the holder of `caller` may learn about `target`.
///
/// Introspection is a query by one party about another party's token, so
/// every boundary refuses a caller asking about a token of its own client.
pub trait AuthorizationBoundary: Send + Sync {
    fn may_introspect(&self, caller: &AccessToken, target: &AccessToken) -> bool;
}

/// Caller and target must belong to different clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct DistinctClientBoundary;

impl AuthorizationBoundary for DistinctClientBoundary {
    fn may_introspect(&self, caller: &AccessToken, target: &AccessToken) -> bool {
        caller.client_id != target.client_id
    }
}

/// Different clients, and the caller's audience must share at least one
/// entry with the target's audience.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudienceOverlapBoundary;

impl AuthorizationBoundary for AudienceOverlapBoundary {
    fn may_introspect(&self, caller: &AccessToken, target: &AccessToken) -> bool {
        DistinctClientBoundary.may_introspect(caller, target)
            && scope::overlaps(&caller.audience, &target.audience)
    }
}

/// Boundary selected by `AS_REQUIRE_AUDIENCE_OVERLAP`.
pub fn boundary_for(require_audience_overlap: bool) -> Box<dyn AuthorizationBoundary> {
    if require_audience_overlap {
        Box::new(AudienceOverlapBoundary)
    } else {
        Box::new(DistinctClientBoundary)
    }
}
