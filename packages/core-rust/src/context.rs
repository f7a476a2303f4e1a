use crate::types::{Principal, Role};

/// Per-request context carrying identity and tracing information.
/// Threaded from the HTTP layer into every service call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Value of the `x-request-id` header assigned at the edge.
    pub request_id: String,
    /// Authenticated principal, if the request carried an identity.
    pub principal: Option<Principal>,
}

impl RequestContext {
    #[must_use]
    pub fn anonymous(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            principal: None,
        }
    }

    #[must_use]
    pub fn authenticated(request_id: impl Into<String>, principal: Principal) -> Self {
        Self {
            request_id: request_id.into(),
            principal: Some(principal),
        }
    }

    /// Returns the principal if it holds one of `roles`.
    ///
    /// `None` means either no identity or an insufficient role; callers map
    /// the two cases to 401 and 403 themselves via [`RequestContext::principal`].
    #[must_use]
    pub fn principal_with_role(&self, roles: &[Role]) -> Option<&Principal> {
        self.principal.as_ref().filter(|p| p.has_role(roles))
    }
}
