use waveroom::{Server, clap, runtime};
use waveroom_core::{Error, debug_info, error};

fn main() {
	let args = clap::parse();

	let exit = match exec(&args) {
		| Ok(()) => {
			debug_info!("Exit");
			0
		},
		| Err(error) => {
			error!("Critical error: {error}");
			exit_code(&error)
		},
	};

	std::process::exit(exit);
}

fn exec(args: &clap::Args) -> Result<(), Error> {
	let runtime = runtime::new(args)?;
	let server = Server::new(args, Some(runtime.handle()))?;

	waveroom::exec(&server, runtime)
}

/// Fatal configuration exits 1; a storage layer that never came up exits 2.
fn exit_code(error: &Error) -> i32 {
	match error {
		| Error::Config(..) | Error::Figment(..) | Error::TomlDe(..) => 1,
		| Error::Database(..) => 2,
		| _ => 1,
	}
}
