use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::runtime;
use tokio::task;

use rangeban::Address;
use rangeban::guard::{Ban, Config, Guard};
use rangeban::protocol::{self, ReadError, Request, Response};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serves an address range ban list over a Unix socket", long_about = None)]
struct Args {
	/// Ban list to restore at startup and append new bans to
	#[arg(long)]
	store: Option<PathBuf>,

	/// Unix socket to listen on
	socket: PathBuf,
}

/// Clients ban explicitly, so queries never add bans.
fn never_ban(_address: &Address, _request: &()) -> Ban {
	Ban::NoBan
}

type ClientGuard = Guard<fn(&Address, &()) -> Ban>;

async fn respond(guard: &ClientGuard, request: Request) -> Response {
	match request {
		Request::Query(address) => guard.check_address(address, &()).into(),
		Request::Ban(range) => {
			guard.ban(range);
			Response::Banned
		},
		Request::Snapshot => {
			match guard.snapshot().await {
				Ok(count) => Response::Saved(count),
				Err(err) => Response::Error(err.to_string()),
			}
		},
	}
}

async fn serve(guard: &ClientGuard, client: UnixStream) -> Result<(), ReadError> {
	let (reader, mut writer) = client.into_split();
	let mut reader = BufReader::new(reader);

	loop {
		let response =
			match protocol::read_request(&mut reader).await {
				Ok(request) => respond(guard, request).await,
				Err(ReadError::End) => return Ok(()),
				Err(ReadError::Format(message)) => Response::Error(message),
				Err(err) => return Err(err),
			};

		protocol::write_response(&mut writer, &response).await?;
	}
}

async fn interact(guard: Rc<ClientGuard>, client: UnixStream) {
	if let Err(err) = serve(&guard, client).await {
		warn!("client error: {}", err);
	}
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
	let config = Config {
		store: args.store,
		..Config::default()
	};

	let guard = Rc::new(Guard::new(never_ban as fn(&Address, &()) -> Ban, config).await);
	let listener = UnixListener::bind(&args.socket)?;

	info!("Listening on {}", args.socket.display());

	loop {
		let client =
			match listener.accept().await {
				Err(err) => {
					warn!("accept failed: {}", err);
					continue;
				},
				Ok((client, _)) => {
					info!("new client: {:?}", client.peer_cred());
					client
				},
			};

		task::spawn_local(interact(guard.clone(), client));
	}
}

fn main() -> ExitCode {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	let args = Args::parse();

	let result =
		runtime::Builder::new_current_thread()
			.enable_io()
			.build()
			.map_err(Box::<dyn Error>::from)
			.and_then(|single_threaded_runtime| {
				let local = task::LocalSet::new();
				local.block_on(&single_threaded_runtime, async_main(args))
			});

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!("{}", err);
			ExitCode::FAILURE
		},
	}
}
