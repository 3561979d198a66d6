//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes validated realm metadata (`ProviderDescriptor`): the authorization,
//! token, and userinfo endpoints plus the preferred client authentication method.
//! `strategy` defines [`ProviderStrategy`], an HTTP-client-agnostic hook used by the broker to
//! augment the code exchange and map token endpoint errors into the bridge error taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
