//! Bridge a Keycloak authorization-code login into a locally signed, ten-minute session token,
//! served from a single `GET /oauth` endpoint and held by a tiny frontend session store.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod config;
pub mod error;
pub mod http;
pub mod issuer;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod server;
pub mod session;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Fixtures shared by unit tests and downstream handler tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{AuthorizationCode, BrokeredIdentity, ClaimSet, TokenizedIdentity},
		broker::{BrokerFuture, IdentityBroker},
		issuer::{IssuerSettings, TokenIssuer},
		server::AppState,
	};

	/// Issuer string used by test token issuers.
	pub const TEST_ISSUER: &str = "https://bridge.test";
	/// Shared HMAC secret used by test token issuers.
	pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

	/// Builds a token issuer with the test issuer + secret pair.
	pub fn test_token_issuer() -> TokenIssuer {
		TokenIssuer::new(IssuerSettings::new(TEST_ISSUER, TEST_SECRET))
			.expect("Failed to build the test token issuer.")
	}

	/// Scripted broker that answers every code with the same canned identity.
	#[derive(Debug)]
	pub struct FakeBroker {
		/// Identity returned for every call.
		pub identity: BrokeredIdentity,
		/// Codes received so far, in call order.
		pub calls: Mutex<Vec<String>>,
	}
	impl FakeBroker {
		/// Creates a fake broker that always returns `identity`.
		pub fn new(identity: BrokeredIdentity) -> Self {
			Self { identity, calls: Mutex::new(Vec::new()) }
		}

		/// Snapshot of the codes received so far.
		pub fn received_codes(&self) -> Vec<String> {
			self.calls.lock().clone()
		}
	}
	impl IdentityBroker for FakeBroker {
		fn brokered_code_login<'a>(
			&'a self,
			code: &'a AuthorizationCode,
		) -> BrokerFuture<'a, BrokeredIdentity> {
			self.calls.lock().push(code.to_string());

			let identity = self.identity.clone();

			Box::pin(async move { identity })
		}
	}

	/// Builds a fully populated identity for handler tests.
	pub fn sample_identity() -> TokenizedIdentity {
		TokenizedIdentity::new("user-123", "ada@example.com", "access-abc", "refresh-xyz")
	}

	/// Wraps a fake broker and the test issuer into handler state.
	pub fn fake_state(identity: BrokeredIdentity) -> (AppState, Arc<FakeBroker>) {
		let broker = Arc::new(FakeBroker::new(identity));
		let state = AppState::new(broker.clone(), Arc::new(test_token_issuer()));

		(state, broker)
	}

	/// Claim set built from [`sample_identity`].
	pub fn sample_claims() -> ClaimSet {
		ClaimSet::from_identity(Some(&sample_identity()))
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "bin")] use {color_eyre as _, tracing_subscriber as _};
#[cfg(test)] use {httpmock as _, tower as _};
