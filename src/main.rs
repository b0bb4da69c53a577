#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	const_format::formatcp,
	std::{io, path::PathBuf},
	styled_image::{run, sink::PngFile, Error, OUTPUT_PATH, SHAPE},
};

#[derive(Parser)]
#[clap(version, about = formatcp!("Reads a JSON `elements` array from stdin and writes it as a {} PNG", SHAPE))]
struct Args {
	/// PNG to write; an existing file is overwritten
	#[clap(short, long, value_parser, default_value = OUTPUT_PATH)]
	output: PathBuf,
}

fn main() -> Result<(), Error> {
	pretty_env_logger::init();
	let Args { output } = Args::parse();
	run(io::stdin().lock(), &mut PngFile(&output))?;
	println!("Created styled image '{}' ", output.display());
	Ok(())
}
