#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	const_format::formatcp,
	image::Image,
	normalize::normalize,
	record::PixelRecord,
	sink::ImageSink,
	std::{
		io::{self, Read},
		path::PathBuf,
	},
	thiserror::Error,
};

pub const WIDTH: usize = 384;
pub const HEIGHT: usize = 384;
pub const RGB_SIZE: usize = 3;
pub const IMAGE_LEN: usize = WIDTH * HEIGHT * RGB_SIZE;
pub const SHAPE: &str = formatcp!("{}x{} RGB", WIDTH, HEIGHT);
pub const OUTPUT_PATH: &str = "output_styled_image.png";

#[derive(Debug, Error)]
pub enum Error {
	#[error("reading input: {0}")]
	Io(#[from] io::Error),

	#[error("parsing pixel record: {0}")]
	Json(#[from] serde_json::Error),

	#[error("`elements` is empty")]
	EmptyElements,

	#[error("division by zero: max(elements) is 0")]
	DivideByZero,

	#[error("insufficient data: a {shape} image needs {expected} bytes, got {actual}", shape = SHAPE)]
	InsufficientData { expected: usize, actual: usize },

	#[error("encoding PNG: {0}")]
	Png(#[from] png::EncodingError),

	#[error("writing {}: {source}", .path.display())]
	Write { path: PathBuf, source: io::Error },
}

pub mod record {
	use {
		crate::Error,
		serde::Deserialize,
		std::io::{self, Read},
	};

	pub fn io_readToString(mut reader: impl Read) -> io::Result<String> {
		let mut string = String::new();
		reader.read_to_string(&mut string)?;
		Ok(string)
	}

	/// `{"elements": [...]}`; any other field of the object is ignored.
	#[derive(Debug, Deserialize)]
	pub struct PixelRecord {
		pub elements: Vec<f64>,
	}

	impl PixelRecord {
		pub fn parse(json: &str) -> Result<Self, Error> {
			Ok(serde_json::from_str(json)?)
		}

		/// Blocks until `reader` hits end-of-stream.
		pub fn fromReader(reader: impl Read) -> Result<Self, Error> {
			let json = io_readToString(reader)?;
			log::debug!("read {} bytes of input", json.len());
			Self::parse(&json)
		}
	}
}

pub mod normalize {
	use crate::Error;

	pub fn minMax(elements: &[f64]) -> Option<(f64, f64)> {
		let (&first, rest) = elements.split_first()?;
		Some(rest.iter().fold((first, first), |(lo, hi), &element| (lo.min(element), hi.max(element))))
	}

	/// Maps every element `e` to `wrappingCast((e - min) / max * 255)`.
	///
	/// The divisor is the raw maximum rather than `max - min`. With a non-negative minimum the
	/// results stay within `0..=255`; otherwise they leave that range and wrap.
	///
	/// # Errors
	/// [`Error::EmptyElements`] for an empty slice, [`Error::DivideByZero`] when the maximum is 0.
	#[allow(clippy::float_cmp)]
	pub fn normalize(elements: &[f64]) -> Result<Vec<u8>, Error> {
		let (lo, scale) = minMax(elements).ok_or(Error::EmptyElements)?;
		log::debug!("normalizing {} elements: lo = {lo}, scale = {scale}", elements.len());
		if scale == 0.0 {
			return Err(Error::DivideByZero);
		}
		Ok(elements.iter().map(|&element| wrappingCast((element - lo) / scale * 255.0)).collect())
	}

	/// Truncates toward zero, then keeps the low 8 bits: `510.0` becomes `254`, `-1.0` becomes `255`.
	/// NaN becomes 0; infinities saturate to `i64` limits first.
	#[inline]
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	pub fn wrappingCast(value: f64) -> u8 {
		value as i64 as u8
	}
}

pub mod image {
	use crate::{Error, HEIGHT, IMAGE_LEN, RGB_SIZE, WIDTH};

	/// Row-major, channel-interleaved RGB.
	pub struct Image {
		pub width: usize,
		pub height: usize,
		pub data: Vec<u8>,
	}

	impl Image {
		/// Takes the first [`IMAGE_LEN`] bytes of `data`; anything past them is dropped.
		///
		/// # Errors
		/// [`Error::InsufficientData`] when `data` is shorter than [`IMAGE_LEN`].
		pub fn fromNormalized(mut data: Vec<u8>) -> Result<Self, Error> {
			let actual = data.len();
			if actual < IMAGE_LEN {
				return Err(Error::InsufficientData { expected: IMAGE_LEN, actual });
			}
			if actual > IMAGE_LEN {
				log::debug!("dropping {} trailing bytes", actual - IMAGE_LEN);
				data.truncate(IMAGE_LEN);
			}
			Ok(Self { width: WIDTH, height: HEIGHT, data })
		}

		/// # Panics
		/// If `(x, y)` lies outside the image.
		pub fn pixel(&self, x: usize, y: usize) -> [u8; RGB_SIZE] {
			assert!(x < self.width && y < self.height, "({x}, {y}) is outside {}x{}", self.width, self.height);
			let i = (y * self.width + x) * RGB_SIZE;
			let mut rgb = [0; RGB_SIZE];
			rgb.copy_from_slice(&self.data[i..i + RGB_SIZE]);
			rgb
		}
	}
}

pub mod sink {
	use {
		crate::{image::Image, Error},
		png::{BitDepth, ColorType},
		std::{
			fs::File,
			io::{self, BufWriter, Write},
			path::Path,
		},
	};

	pub trait ImageSink {
		fn put(&mut self, image: &Image) -> Result<(), Error>;
	}

	pub fn encodePng(writer: impl Write, image: &Image) -> Result<(), Error> {
		let mut png = png::Encoder::new(writer, image.width as _, image.height as _);
		png.set_color(ColorType::Rgb);
		png.set_depth(BitDepth::Eight);
		let mut png = png.write_header()?;
		png.write_image_data(&image.data)?;
		png.finish()?;
		Ok(())
	}

	/// Creates or truncates the file at the wrapped path. Not atomic: a failure mid-write leaves a
	/// partial PNG behind.
	pub struct PngFile<P>(pub P);

	impl<P: AsRef<Path>> ImageSink for PngFile<P> {
		fn put(&mut self, image: &Image) -> Result<(), Error> {
			let path = self.0.as_ref();
			let writeError = |source: io::Error| Error::Write { path: path.to_owned(), source };
			let file = &mut BufWriter::new(File::create(path).map_err(writeError)?);
			encodePng(&mut *file, image)?;
			file.flush().map_err(writeError)?;
			log::info!("wrote {}", path.display());
			Ok(())
		}
	}

	impl ImageSink for Vec<u8> {
		fn put(&mut self, image: &Image) -> Result<(), Error> {
			encodePng(self, image)
		}
	}
}

/// Read, parse, normalize, pack, then hand the image to `sink`. Nothing reaches `sink` unless every
/// earlier stage succeeded.
///
/// # Errors
/// The first failing stage's [`Error`].
pub fn run(input: impl Read, sink: &mut impl ImageSink) -> Result<(), Error> {
	let record = PixelRecord::fromReader(input)?;
	let image = Image::fromNormalized(normalize(&record.elements)?)?;
	sink.put(&image)
}
