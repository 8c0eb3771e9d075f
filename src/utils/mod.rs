//! Low-level signal processing utilities shared by the analyses

pub mod fft;

pub use fft::Fft;
