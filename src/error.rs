use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use super::address::AddressError;

#[derive(Debug)]
pub enum Error {
	Address(AddressError),
	Io(io::Error),

	/// A line of a store file isn’t a ranged address.
	Store {
		path: PathBuf,
		line: usize,
		error: AddressError,
	},

	/// The task writing to the store has stopped.
	Closed,
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Self::Address(err) | Self::Store { error: err, .. } => Some(err),
			Self::Io(err) => Some(err),
			Self::Closed => None,
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Address(err) => write!(f, "{}", err),
			Self::Io(err) => write!(f, "{}", err),
			Self::Store { path, line, error } => write!(f, "{}:{}: {}", path.display(), line, error),
			Self::Closed => write!(f, "store writer stopped"),
		}
	}
}

impl From<AddressError> for Error {
	fn from(error: AddressError) -> Self {
		Self::Address(error)
	}
}

impl From<io::Error> for Error {
	fn from(error: io::Error) -> Self {
		Self::Io(error)
	}
}

/// Receives errors the guard and its store writer recover from.
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Logs the error.
pub fn log_error(error: &Error) {
	log::error!("{}", error);
}

pub fn ignore_error(_error: &Error) {}
