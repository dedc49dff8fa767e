#![cfg(test)]

use std::time::Duration;

use waveroom::{Server, clap::Args, runtime};
use waveroom_core::Result;

#[test]
fn dummy() {}

#[test]
#[should_panic = "dummy"]
fn panic_dummy() { panic!("dummy") }

#[test]
fn smoke() -> Result {
	let args = Args::default_test();
	let runtime = runtime::new(&args)?;
	let server = Server::new(&args, Some(runtime.handle()))?;

	// ask for shutdown shortly after startup so exec returns
	let core = server.server.clone();
	std::thread::spawn(move || {
		std::thread::sleep(Duration::from_millis(750));
		core.shutdown().ok();
	});

	waveroom::exec(&server, runtime)
}
