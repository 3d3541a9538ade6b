//! Partial observation for posgrid games.
//!
//! An [`ObservationWindow`] turns the global positions of entities into a
//! fixed-shape, viewer-centred [`Observation`]. What is visible is decided
//! by a [`Visibility`] rule; how it is serialised is decided by an
//! [`ObservationMode`]. Every window can describe its own output as an
//! [`ObservationSpace`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod observation;
pub mod space;
pub mod window;

pub use observation::{Observation, ObservationMode, Record};
pub use space::ObservationSpace;
pub use window::{Entity, EntityClass, ObservationWindow, Visibility, SENTINEL};
