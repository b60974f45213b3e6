//! Command line front end for `celeba-data`.
//!
//! Subcommands are implemented as plain functions taking parsed arguments so
//! they can be driven from tests as well as from the `celeba` binary.

pub mod backend;
pub mod inspect;
pub mod sampling;

pub use backend::{create_device, SelectedBackend, SelectedDevice, NAME};
pub use inspect::{run_inspect, InspectArgs};
pub use sampling::{run_sampling, SamplingArgs, SamplingReport};
