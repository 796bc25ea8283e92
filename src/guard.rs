//! Route guards deciding whether a navigation may proceed based on authentication state.
//!
//! Guards never navigate themselves. They return a [`GuardDecision`] and the host performs the
//! redirect, either in-app or as a full external navigation.

// self
use crate::{_prelude::*, credential::CredentialSource};

/// Outcome of a guard check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
	/// Navigation may proceed.
	Allow,
	/// Navigation is blocked; the host should go to `target` instead.
	Redirect {
		/// Fallback location.
		target: String,
		/// `true` when `target` leaves the app (it starts with `http`).
		external: bool,
	},
}
impl GuardDecision {
	/// Builds a redirect, classifying `target` as in-app or external.
	pub fn redirect(target: impl Into<String>) -> Self {
		let target = target.into();
		let external = target.starts_with("http");

		Self::Redirect { target, external }
	}

	/// Returns `true` for [`GuardDecision::Allow`].
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow)
	}
}

/// Admits only authenticated users; everyone else goes to the public fallback page.
#[derive(Clone)]
pub struct ProtectedGuard {
	source: Arc<dyn CredentialSource>,
	public_fallback: String,
}
impl ProtectedGuard {
	/// Creates a guard redirecting anonymous users to `public_fallback`.
	pub fn new(source: Arc<dyn CredentialSource>, public_fallback: impl Into<String>) -> Self {
		Self { source, public_fallback: public_fallback.into() }
	}

	/// Checks whether navigation to `url` may proceed.
	///
	/// Blocked navigations are recorded through
	/// [`CredentialSource::set_interrupted_url`] so sign-in can return to them.
	pub async fn can_activate(&self, url: &str) -> GuardDecision {
		if self.source.is_authenticated().await || url == self.public_fallback {
			return GuardDecision::Allow;
		}

		self.source.set_interrupted_url(url);

		GuardDecision::redirect(self.public_fallback.as_str())
	}
}
impl Debug for ProtectedGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProtectedGuard")
			.field("public_fallback", &self.public_fallback)
			.finish_non_exhaustive()
	}
}

/// Admits only anonymous users; signed-in users go to the protected fallback page.
#[derive(Clone)]
pub struct PublicGuard {
	source: Arc<dyn CredentialSource>,
	protected_fallback: String,
}
impl PublicGuard {
	/// Creates a guard redirecting signed-in users to `protected_fallback`.
	pub fn new(source: Arc<dyn CredentialSource>, protected_fallback: impl Into<String>) -> Self {
		Self { source, protected_fallback: protected_fallback.into() }
	}

	/// Checks whether navigation to `url` may proceed.
	pub async fn can_activate(&self, url: &str) -> GuardDecision {
		if !self.source.is_authenticated().await || url == self.protected_fallback {
			return GuardDecision::Allow;
		}

		GuardDecision::redirect(self.protected_fallback.as_str())
	}
}
impl Debug for PublicGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PublicGuard")
			.field("protected_fallback", &self.protected_fallback)
			.finish_non_exhaustive()
	}
}
