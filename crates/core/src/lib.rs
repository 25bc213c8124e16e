//! Face liveness detection for live video streams.
//!
//! The crate is organized around the acquisition-to-decision cycle:
//! a [`capture::domain::frame_source::FrameSource`] yields frames, an
//! optional face detector localizes a crop, the liveness classifier turns a
//! normalized tensor into a probability, and the decision/render layer turns
//! that into a user-visible verdict or overlay. The `pipeline` module owns
//! the session state machine and the two loop modes (on-demand scan,
//! continuous watch).

pub mod capture;
pub mod detection;
pub mod liveness;
pub mod pipeline;
pub mod render;
pub mod shared;
