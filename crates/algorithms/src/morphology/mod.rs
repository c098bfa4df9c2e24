//! Binary morphology for masks
//!
//! - **Dilation**: grow set pixels by a structuring element
//! - **Labeling**: connected-component labeling (4- or 8-connectivity)
//! - **Sieve**: merge small regions into their largest neighbour
//! - **Cleanup**: two-pass sieve with focal rescue

mod cleanup;
mod dilate;
mod element;
mod label;
mod sieve;

pub use cleanup::{CleanupOutput, CleanupPolicy};
pub use dilate::{dilate, Dilate, DilateParams};
pub use element::StructuringElement;
pub use label::{label_regions, label_value_regions, Connectivity, Labels};
pub use sieve::{sieve, Sieve, SieveParams};
