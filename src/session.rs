//! Frontend session store holding at most one session token.
//!
//! The store never inspects the token; it only tracks whether one is held.

// self
use crate::_prelude::*;

/// Errors raised by [`SessionStore::login`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum SessionError {
	/// `login` was called with an empty token.
	#[error("Token cannot be empty, use logout() to reset the token.")]
	EmptyToken,
	/// A token is already held; `logout` must come first.
	#[error("Already logged in.")]
	AlreadyLoggedIn,
}

/// Session lifecycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
	/// No token held.
	#[default]
	LoggedOut,
	/// A non-empty token is held.
	LoggedIn(String),
}

/// Two-state token holder used by the frontend.
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
	state: SessionState,
}
impl SessionStore {
	/// Creates a logged-out store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `token` and moves to [`SessionState::LoggedIn`].
	pub fn login(&mut self, token: impl Into<String>) -> Result<(), SessionError> {
		let token = token.into();

		if token.is_empty() {
			return Err(SessionError::EmptyToken);
		}
		if self.is_logged_in() {
			return Err(SessionError::AlreadyLoggedIn);
		}

		self.state = SessionState::LoggedIn(token);

		Ok(())
	}

	/// Drops any held token.
	pub fn logout(&mut self) {
		self.state = SessionState::LoggedOut;
	}

	/// True while a token is held.
	pub fn is_logged_in(&self) -> bool {
		matches!(self.state, SessionState::LoggedIn(_))
	}

	/// Held token, or `""` when logged out.
	pub fn jwt_token(&self) -> &str {
		match &self.state {
			SessionState::LoggedIn(token) => token,
			SessionState::LoggedOut => "",
		}
	}

	/// Current state.
	pub fn state(&self) -> &SessionState {
		&self.state
	}
}
