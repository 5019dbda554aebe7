//! Draw-call capture engine.
//!
//! This crate is the driver-independent half of the vkscoop layer: it owns
//! the deep-copied Vulkan state (snapshots), the per-command-buffer shadow
//! recordings, the device-object state tables and the draw-call
//! reconstructor that renders captured draws into Amber scene files.
//!
//! Everything driver-facing (dispatch chaining, the actual GPU read-back)
//! lives in `vkscoop-layer` and reaches this crate through the
//! [`tracker::BufferReadback`] and [`disasm::SpirvDisassembler`] seams, so
//! the whole engine is testable with synthetic handles.

pub mod amber;
pub mod buffer_file;
pub mod command;
pub mod deep_copy;
pub mod descriptor;
pub mod disasm;
pub mod formats;
pub mod shadow;
pub mod tables;
pub mod tracker;

pub use command::Command;
pub use shadow::{CommandBufferShadow, ShadowStore};
pub use tables::DeviceTables;
pub use tracker::{BufferReadback, CaptureContext, DrawCallTracker};
