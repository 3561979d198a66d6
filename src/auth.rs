//! Auth-domain identifiers, the inbound authorization code, brokered identities, and claim sets.

pub mod claims;
pub mod code;
pub mod id;
pub mod identity;
pub mod secret;

pub use claims::*;
pub use code::*;
pub use id::*;
pub use identity::*;
pub use secret::*;
