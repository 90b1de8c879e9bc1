use std::error::Error;
use std::fmt;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::address::{ADDRESS_BITS, Address, RangedAddress};
use super::guard::Verdict;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
	Query(Address),
	Ban(RangedAddress),
	Snapshot,
}

impl Request {
	/// Parses one request line: `QUERY <address>`, `BAN <address>[/<prefix-length>]`, or `SNAPSHOT`.
	pub fn parse(line: &str) -> Result<Self, ReadError> {
		let mut words = line.split_whitespace();

		Ok(
			match (words.next(), words.next(), words.next()) {
				(Some("QUERY"), Some(address), None) => {
					Self::Query(
						Address::parse(address)
							.map_err(|err| ReadError::Format(format!("{}: {}", err, address)))?
					)
				},
				(Some("BAN"), Some(target), None) => {
					let range =
						if target.contains('/') {
							RangedAddress::parse(target)
						} else {
							Address::parse(target).and_then(|address| RangedAddress::new(address, ADDRESS_BITS))
						};

					Self::Ban(range.map_err(|err| ReadError::Format(format!("{}: {}", err, target)))?)
				},
				(Some("SNAPSHOT"), None, None) => Self::Snapshot,
				_ => return Err(ReadError::Format(format!("unknown request: {}", line.trim()))),
			}
		)
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
	Allowed,
	Banned,
	Saved(usize),
	Error(String),
}

impl fmt::Display for Response {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Allowed => write!(f, "ALLOWED"),
			Self::Banned => write!(f, "BANNED"),
			Self::Saved(count) => write!(f, "SAVED {}", count),
			Self::Error(message) => write!(f, "ERROR {}", message),
		}
	}
}

impl From<Verdict> for Response {
	fn from(verdict: Verdict) -> Self {
		match verdict {
			Verdict::Allowed(_) => Self::Allowed,
			Verdict::Banned(_) => Self::Banned,
			Verdict::Rejected(err) => Self::Error(err.to_string()),
		}
	}
}

#[derive(Debug)]
pub enum ReadError {
	End,
	Format(String),
	Io(io::Error),
}

impl Error for ReadError {}

impl fmt::Display for ReadError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::End => write!(f, "end of stream"),
			Self::Format(message) => write!(f, "{}", message),
			Self::Io(err) => write!(f, "{}", err),
		}
	}
}

impl From<io::Error> for ReadError {
	fn from(error: io::Error) -> Self {
		Self::Io(error)
	}
}

/// Reads the next request, skipping blank lines.
pub async fn read_request<T: AsyncBufRead + Unpin>(source: &mut T) -> Result<Request, ReadError> {
	let mut line = String::new();

	loop {
		line.clear();

		if source.read_line(&mut line).await? == 0 {
			return Err(ReadError::End);
		}

		if !line.trim().is_empty() {
			return Request::parse(&line);
		}
	}
}

pub async fn write_response<T: AsyncWrite + Unpin>(sink: &mut T, response: &Response) -> io::Result<()> {
	sink.write_all(format!("{}\n", response).as_bytes()).await
}

#[cfg(test)]
mod tests {
	use tokio::io::BufReader;

	use super::{ReadError, Request, Response, read_request, write_response};
	use crate::address::{Address, RangedAddress};

	#[test]
	fn requests() {
		assert_eq!(Request::parse("QUERY 192.0.2.1\n").unwrap(), Request::Query(Address::parse("192.0.2.1").unwrap()));
		assert_eq!(Request::parse("  SNAPSHOT ").unwrap(), Request::Snapshot);
		assert_eq!(Request::parse("BAN 192.0.2.1").unwrap(), Request::Ban(RangedAddress::parse("192.0.2.1/32").unwrap()));
		assert_eq!(Request::parse("BAN 2001:db8::/32").unwrap(), Request::Ban(RangedAddress::parse("2001:db8::/32").unwrap()));
		assert_eq!(Request::parse("BAN ::1").unwrap(), Request::Ban(RangedAddress::parse("::1/128").unwrap()));
	}

	#[test]
	fn malformed_requests() {
		for line in &["query 192.0.2.1", "QUERY", "QUERY 192.0.2.1 extra", "QUERY 192.0.2", "BAN 192.0.2.1/33", "BAN 192.0.2.1/24/1", "SNAPSHOT now", "HELLO"] {
			match Request::parse(line) {
				Err(ReadError::Format(_)) => {},
				other => panic!("{:?} parsed as {:?}", line, other),
			}
		}
	}

	#[tokio::test]
	async fn reads_until_end() {
		let mut source = BufReader::new(&b"QUERY ::1\n\nSNAPSHOT\nBOGUS\n"[..]);

		assert_eq!(read_request(&mut source).await.unwrap(), Request::Query(Address::parse("::1").unwrap()));
		assert_eq!(read_request(&mut source).await.unwrap(), Request::Snapshot);

		match read_request(&mut source).await {
			Err(ReadError::Format(message)) => assert_eq!(message, "unknown request: BOGUS"),
			other => panic!("unexpected result {:?}", other),
		}

		match read_request(&mut source).await {
			Err(ReadError::End) => {},
			other => panic!("unexpected result {:?}", other),
		}
	}

	#[tokio::test]
	async fn writes_lines() {
		let mut sink = Vec::new();

		write_response(&mut sink, &Response::Banned).await.unwrap();
		write_response(&mut sink, &Response::Saved(3)).await.unwrap();
		write_response(&mut sink, &Response::Error("bad address".to_owned())).await.unwrap();

		assert_eq!(sink, b"BANNED\nSAVED 3\nERROR bad address\n");
	}
}
