//! Storage contract and built-in store for the credentials an endpoint source refreshes.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{_prelude::*, credential::AccessToken};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the current credential pair.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the stored credentials, if any.
	fn fetch(&self) -> StoreFuture<'_, Option<StoredTokens>>;

	/// Persists `tokens`, replacing whatever was stored before.
	fn save(&self, tokens: StoredTokens) -> StoreFuture<'_, ()>;

	/// Removes every stored credential (sign-out).
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Redacted refresh credential wrapper.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken(String);
impl RefreshToken {
	/// Wraps a new refresh token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for RefreshToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("RefreshToken").field(&"<redacted>").finish()
	}
}
impl Display for RefreshToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access credential plus the optional refresh credential that renews it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
	/// Credential attached to outgoing requests.
	pub access_token: AccessToken,
	/// Credential exchanged for a new pair.
	pub refresh_token: Option<RefreshToken>,
}
impl StoredTokens {
	/// Creates a pair from raw strings.
	pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
		Self {
			access_token: AccessToken::new(access_token),
			refresh_token: refresh_token.map(RefreshToken::new),
		}
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
