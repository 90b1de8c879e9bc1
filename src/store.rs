use std::fmt::Write as _;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use log::debug;
use tokio::fs::{File, OpenOptions};
use tokio::io::{self, AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};

use super::address::RangedAddress;
use super::error::{Error, ErrorHandler};

/// A file of ranged addresses, one per line.
#[derive(Clone, Debug)]
pub struct Store {
	path: PathBuf,
}

impl Store {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads every range in the file. A missing file is empty; blank lines are skipped.
	pub async fn load(&self) -> Result<Vec<RangedAddress>, Error> {
		let file =
			match File::open(&self.path).await {
				Ok(file) => file,
				Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
				Err(err) => return Err(err.into()),
			};

		let mut lines = BufReader::new(file).lines();
		let mut ranges = Vec::new();
		let mut line_number = 0;

		while let Some(line) = lines.next_line().await? {
			line_number += 1;
			let line = line.trim();

			if line.is_empty() {
				continue;
			}

			let range = RangedAddress::parse(line)
				.map_err(|error| Error::Store {
					path: self.path.clone(),
					line: line_number,
					error,
				})?;

			ranges.push(range);
		}

		Ok(ranges)
	}

	/// Replaces the file’s contents with `ranges`.
	pub async fn save(&self, ranges: &[RangedAddress]) -> Result<(), Error> {
		let mut file = File::create(&self.path).await?;
		write_ranges(&mut file, ranges).await?;
		Ok(())
	}

	/// Opens the file for `persist`, creating it if it doesn’t exist, positioned at its end. An unterminated last line is terminated first.
	pub(crate) async fn open_log(&self) -> io::Result<File> {
		let mut file =
			OpenOptions::new()
				.read(true)
				.write(true)
				.create(true)
				.open(&self.path)
				.await?;

		if file.seek(SeekFrom::End(0)).await? > 0 {
			file.seek(SeekFrom::End(-1)).await?;

			if file.read_u8().await? != b'\n' {
				file.write_all(b"\n").await?;
				file.flush().await?;
			}
		}

		Ok(file)
	}
}

#[derive(Debug)]
pub(crate) enum Write {
	Append(RangedAddress),

	/// Replaces everything written so far, then reports the outcome.
	Rewrite(Vec<RangedAddress>, oneshot::Sender<io::Result<()>>),
}

async fn write_ranges(log: &mut File, ranges: &[RangedAddress]) -> io::Result<()> {
	let mut text = String::new();

	for range in ranges {
		// Writing to a `String` can’t fail.
		let _ = writeln!(text, "{}", range);
	}

	log.write_all(text.as_bytes()).await?;
	log.flush().await
}

async fn rewrite(log: &mut File, ranges: &[RangedAddress]) -> io::Result<()> {
	log.set_len(0).await?;
	log.seek(SeekFrom::Start(0)).await?;
	write_ranges(log, ranges).await
}

/// Applies writes to the log in the order they’re received, until every sender is dropped.
pub(crate) async fn persist(mut log: File, mut writes: mpsc::UnboundedReceiver<Write>, on_error: ErrorHandler) {
	while let Some(write) = writes.recv().await {
		match write {
			Write::Append(range) => {
				match write_ranges(&mut log, &[range]).await {
					Ok(()) => debug!("persisted {}", range),
					Err(err) => on_error(&err.into()),
				}
			}
			Write::Rewrite(ranges, done) => {
				let result = rewrite(&mut log, &ranges).await;

				if let Err(Err(err)) = done.send(result) {
					// Nobody is waiting for the outcome any more.
					on_error(&err.into());
				}
			}
		}
	}
}
