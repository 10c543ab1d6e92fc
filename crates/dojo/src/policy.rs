//! Which requests may trigger reauthentication.
//!
//! A 401 does not always mean "the session expired, ask the user". Some
//! requests get one for reasons the dialog can't fix:
//!
//! - the refresh or login endpoint itself (refreshing while refreshing
//!   would loop forever)
//! - an anonymous read of a public listing (the page works without login)
//! - an anonymous registration (the page shows its own login prompt)
//!
//! [`RequestPolicy::classify`] sorts a request into [`RequestClass::Guarded`]
//! or [`RequestClass::Exempt`], and only guarded requests ever reach the
//! coordinator.

use std::fmt;

use dojo_transport::HttpRequest;

use crate::PolicyConfig;

/// Why a request is exempt from reauthentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExemptReason {
    /// The refresh or login endpoint.
    AuthEndpoint,
    /// A tokenless read of a public listing.
    PublicListing,
    /// A tokenless registration-style write.
    AnonymousRegistration,
    /// The caller set the skip header.
    OptedOut,
}

impl fmt::Display for ExemptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::AuthEndpoint => "auth endpoint",
            Self::PublicListing => "public listing",
            Self::AnonymousRegistration => "anonymous registration",
            Self::OptedOut => "opted out",
        };
        f.write_str(reason)
    }
}

/// How the interceptor treats a 401 on a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// A 401 may open the reauthentication dialog.
    Guarded,
    /// A 401 is returned to the caller untouched.
    Exempt(ExemptReason),
}

impl RequestClass {
    pub fn is_exempt(self) -> bool {
        matches!(self, Self::Exempt(_))
    }
}

/// Classifies requests according to a [`PolicyConfig`].
#[derive(Debug, Clone, Default)]
pub struct RequestPolicy {
    config: PolicyConfig,
}

impl RequestPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Classifies `request`.
    ///
    /// `token_attached` says whether the interceptor put a bearer token
    /// on it; the public-listing and registration exemptions only apply
    /// to anonymous requests.
    pub fn classify(&self, request: &HttpRequest, token_attached: bool) -> RequestClass {
        if request.header(&self.config.skip_header).is_some() {
            return RequestClass::Exempt(ExemptReason::OptedOut);
        }

        let route = request.route();
        if route == self.config.refresh_path || route == self.config.login_path {
            return RequestClass::Exempt(ExemptReason::AuthEndpoint);
        }

        if !token_attached {
            let (prefixes, reason) = if request.method().is_read_only() {
                (&self.config.public_prefixes, ExemptReason::PublicListing)
            } else {
                (
                    &self.config.registration_prefixes,
                    ExemptReason::AnonymousRegistration,
                )
            };
            if prefixes.iter().any(|prefix| under(route, prefix)) {
                return RequestClass::Exempt(reason);
            }
        }

        RequestClass::Guarded
    }
}

/// `true` if `route` is `prefix` or a path below it.
fn under(route: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match route.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
