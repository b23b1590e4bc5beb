//! File-backed [`TokenCacher`] for CLIs and single-host deployments sharing one token.

// std
use std::{
	fs::{self, File, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	cache::{self, CacheError, CacheFuture, TokenCacher, TokenDocument},
	token::AccessToken,
};

/// Persists the token as `{"token": ..., "expiresAt": <RFC3339>}` in a single JSON file.
///
/// Every operation reads or rewrites the whole file under one mutex. The file is created
/// (mode `0600` on Unix) when absent, and an empty file reads as "never set".
#[derive(Clone, Debug)]
pub struct FileCacher {
	path: PathBuf,
	lock: Arc<Mutex<()>>,
}
impl FileCacher {
	/// Opens (or creates) the cache file at the provided path.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		if !path.exists() {
			Self::create_private(&path)?;
		}

		Ok(Self { path, lock: Default::default() })
	}

	/// Returns the backing file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn create_private(path: &Path) -> Result<File, CacheError> {
		let mut options = OpenOptions::new();

		options.write(true).create(true).truncate(true);

		#[cfg(unix)]
		{
			use std::os::unix::fs::OpenOptionsExt;

			options.mode(0o600);
		}

		options.open(path).map_err(|e| CacheError::Backend {
			message: format!("Failed to create {}: {e}", path.display()),
		})
	}

	fn load_locked(&self) -> Result<AccessToken, CacheError> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound =>
				return Err(CacheError::TokenNotExist),
			Err(e) =>
				return Err(CacheError::Backend {
					message: format!("Failed to read {}: {e}", self.path.display()),
				}),
		};

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Err(CacheError::TokenNotExist);
		}

		TokenDocument::decode(&bytes)
	}

	fn persist_locked(&self, token: &AccessToken) -> Result<(), CacheError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = TokenDocument::encode(token)?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = Self::create_private(&tmp_path)?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenCacher for FileCacher {
	fn get(&self) -> CacheFuture<'_, AccessToken> {
		Box::pin(async move {
			let _guard = self.lock.lock();
			let token = self.load_locked()?;

			cache::ensure_fresh(token, OffsetDateTime::now_utc())
		})
	}

	fn set(&self, token: AccessToken) -> CacheFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.lock.lock();

			self.persist_locked(&token)
		})
	}
}
