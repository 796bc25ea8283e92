//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// crates.io
use parking_lot::RwLock;
// self
use crate::{
	_prelude::*,
	store::{StoreFuture, StoredTokens, TokenStore},
};

/// Storage backend that keeps the credential pair in-process.
///
/// Clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<StoredTokens>>>);
impl MemoryStore {
	/// Creates a store seeded with `tokens`.
	pub fn with_tokens(tokens: StoredTokens) -> Self {
		Self(Arc::new(RwLock::new(Some(tokens))))
	}

	/// Returns the stored pair without going through the async contract.
	pub fn snapshot(&self) -> Option<StoredTokens> {
		self.0.read().clone()
	}
}
impl TokenStore for MemoryStore {
	fn fetch(&self) -> StoreFuture<'_, Option<StoredTokens>> {
		let tokens = self.snapshot();

		Box::pin(async move { Ok(tokens) })
	}

	fn save(&self, tokens: StoredTokens) -> StoreFuture<'_, ()> {
		*self.0.write() = Some(tokens);

		Box::pin(async { Ok(()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		self.0.write().take();

		Box::pin(async { Ok(()) })
	}
}
