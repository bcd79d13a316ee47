//! FIR filter design and real-time filtering

pub mod windows;
pub mod design;
pub mod fir;
pub mod fast_fir;
pub mod bank;

pub use windows::{WindowType, generate_window};
pub use design::{design_bandpass, frequency_response, magnitude_response_db, unwrap_phase};
pub use fir::FirFilter;
pub use fast_fir::FastFirFilter;
pub use bank::{Band, FilterBank};
