//! Shared terminal UI pieces.

pub mod error;

pub use error::ErrorScreen;

/// The ova logo, rendered as a two-line header in every screen.
pub const LOGO: &str = " ┏┓┓┏┏┓ \n ┗┛┗┛┣┫ ";
