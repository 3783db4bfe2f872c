//! Signal processing blocks
//!
//! Building blocks for the channel strips and the master bus. None of them
//! allocate after construction; all process `StereoBuffer`s in place.

mod compressor;
mod delay;
mod eq;
mod pan;
mod reverb;
mod smoother;

pub use compressor::{Compressor, CompressorSettings};
pub use delay::StereoDelay;
pub use eq::{BiquadCoeffs, EqBand, ThreeBandEq};
pub use pan::StereoPanner;
pub use reverb::Reverb;
pub use smoother::{ramp_frames, GainSmoother};
