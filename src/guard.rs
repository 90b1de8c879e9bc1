use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use log::{debug, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle};

use super::address::{ADDRESS_BITS, Address, AddressError, RangedAddress};
use super::error::{Error, ErrorHandler, log_error};
use super::range_set::RangeSet;
use super::store::{Store, Write, persist};
use super::trie::RangeTrie;

/// What to do about an address that isn’t banned yet.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Ban {
	NoBan,

	/// Ban only the address itself.
	Address,

	/// Ban every address sharing this many leading bits with it, out of `ADDRESS_BITS`. Zero bans everything.
	Range(u8),
}

/// Decides whether a request’s address should be banned.
pub trait Banner<R: ?Sized> {
	fn ban(&self, address: &Address, request: &R) -> Ban;
}

impl<R: ?Sized, F> Banner<R> for F
where
	F: Fn(&Address, &R) -> Ban,
{
	fn ban(&self, address: &Address, request: &R) -> Ban {
		self(address, request)
	}
}

#[derive(Clone)]
pub struct Config {
	/// Where bans are loaded from at startup and appended to. Nothing is loaded or stored without one.
	pub store: Option<PathBuf>,

	pub on_error: ErrorHandler,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			store: None,
			on_error: Arc::new(log_error),
		}
	}
}

#[derive(Debug)]
pub enum Verdict {
	Allowed(Address),
	Banned(Address),

	/// The remote address couldn’t be parsed.
	Rejected(Error),
}

impl fmt::Display for Verdict {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Allowed(address) => write!(f, "{} is allowed", address),
			Self::Banned(address) => write!(f, "{} is banned", address),
			Self::Rejected(err) => write!(f, "{}", err),
		}
	}
}

struct Writer {
	writes: mpsc::UnboundedSender<Write>,
	task: JoinHandle<()>,
}

/// Checks addresses against a ban list, consulting a `Banner` to extend it.
pub struct Guard<B> {
	banner: B,
	ranges: Box<dyn RangeSet>,
	store: Option<Store>,
	writer: Option<Writer>,

	/// Held while changing the ranges or reading them for a snapshot, until the matching write is queued.
	changes: Mutex<()>,

	on_error: ErrorHandler,
}

impl<B> Guard<B> {
	pub async fn new(banner: B, config: Config) -> Self {
		Self::with_ranges(banner, config, Box::new(RangeTrie::new())).await
	}

	/// Uses `ranges` to hold the bans, after adding the stored ones to it. Must be called within a Tokio runtime if `config` has a store.
	pub async fn with_ranges(banner: B, config: Config, ranges: Box<dyn RangeSet>) -> Self {
		let Config { store, on_error } = config;
		let store = store.map(Store::new);
		let mut writer = None;

		if let Some(store) = &store {
			match store.load().await {
				Ok(loaded) => {
					for range in &loaded {
						ranges.insert(range);
					}

					info!("Restored {} bans from {}", loaded.len(), store.path().display());
				},
				Err(err) => on_error(&err),
			}

			match store.open_log().await {
				Ok(log) => {
					let (writes, received) = mpsc::unbounded_channel();
					let task = task::spawn(persist(log, received, on_error.clone()));
					writer = Some(Writer { writes, task });
				},
				Err(err) => on_error(&err.into()),
			}
		}

		Self {
			banner,
			ranges,
			store,
			writer,
			changes: Mutex::new(()),
			on_error,
		}
	}

	pub fn ranges(&self) -> &dyn RangeSet {
		&*self.ranges
	}

	/// Checks the address in a `host:port`, `[host]:port`, or bare host string.
	pub fn check<R: ?Sized>(&self, remote_address: &str, request: &R) -> Verdict
	where
		B: Banner<R>,
	{
		match parse_remote_address(remote_address) {
			Ok(address) => self.check_address(address, request),
			Err(err) => {
				let err = Error::from(err);
				(self.on_error)(&err);
				Verdict::Rejected(err)
			},
		}
	}

	/// An address that’s already covered is banned without asking the banner. Otherwise the banner’s decision is recorded and applied.
	pub fn check_address<R: ?Sized>(&self, address: Address, request: &R) -> Verdict
	where
		B: Banner<R>,
	{
		if self.ranges.has(&address) {
			return Verdict::Banned(address);
		}

		let prefix_length =
			match self.banner.ban(&address, request) {
				Ban::NoBan => return Verdict::Allowed(address),
				Ban::Address => ADDRESS_BITS,
				Ban::Range(prefix_length) => prefix_length,
			};

		match RangedAddress::new(address, prefix_length) {
			Ok(range) => {
				self.ban(range);
			},
			Err(err) => (self.on_error)(&err.into()),
		}

		Verdict::Banned(address)
	}

	/// Adds a range to the ban list and queues it to be stored, returning whether it wasn’t already covered.
	pub fn ban(&self, range: RangedAddress) -> bool {
		let _changes = self.changes.lock().unwrap_or_else(PoisonError::into_inner);

		if !self.ranges.insert(&range) {
			return false;
		}

		debug!("banned {}", range);

		if let Some(writer) = &self.writer {
			if writer.writes.send(Write::Append(range)).is_err() {
				(self.on_error)(&Error::Closed);
			}
		}

		true
	}

	/// Replaces the store’s contents with the current bans, returning how many ranges that took.
	pub async fn snapshot(&self) -> Result<usize, Error> {
		let (entries, finished) = {
			let _changes = self.changes.lock().unwrap_or_else(PoisonError::into_inner);
			let entries = self.ranges.entries();

			match &self.writer {
				Some(writer) => {
					let (done, finished) = oneshot::channel();

					writer.writes.send(Write::Rewrite(entries.clone(), done))
						.map_err(|_| Error::Closed)?;

					(entries, Some(finished))
				},
				None => (entries, None),
			}
		};

		if let Some(finished) = finished {
			finished.await.map_err(|_| Error::Closed)??;
		} else if let Some(store) = &self.store {
			store.save(&entries).await?;
		}

		info!("Saved {} bans", entries.len());
		Ok(entries.len())
	}

	/// Waits for queued bans to be stored, then stops storing.
	pub async fn close(self) -> Result<(), Error> {
		if let Some(Writer { writes, task }) = self.writer {
			drop(writes);
			task.await.map_err(|_| Error::Closed)?;
		}

		Ok(())
	}
}

/// Extracts the address from a `host:port`, `[host]:port`, or bare host string. The port isn’t checked.
pub fn parse_remote_address(remote_address: &str) -> Result<Address, AddressError> {
	let host =
		if let Some(rest) = remote_address.strip_prefix('[') {
			match rest.split_once(']') {
				Some((host, port)) if port.is_empty() || port.starts_with(':') => host,
				_ => return Err(AddressError::BadAddress),
			}
		} else {
			match remote_address.split_once(':') {
				Some((host, port)) if !port.contains(':') => host,
				// More than one colon: a bare IPv6 address.
				_ => remote_address,
			}
		};

	Address::parse(host)
}
