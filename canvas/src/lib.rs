//! Board state engine for the moodboard.
//!
//! This crate owns everything that happens on an open board: the observable
//! item store, stacking-order arithmetic, camera and hit-testing, the gesture
//! state machine, the layer list, and the side panels. The host wires raw
//! input to [`engine::Engine`] and draws what [`engine::Engine::scene`] returns.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Per-board input coordinator and direct item edits |
//! | [`store`] | `ItemStore` contract, in-process `LocalStore`, `LiveQuery` |
//! | [`doc`] | Boards, items, search settings, sparse updates |
//! | [`ordering`] | Two-tier stack-order arithmetic |
//! | [`layers`] | Layer list drag-to-reorder and rename |
//! | [`panel`] | Resizable, collapsible side panels with peek |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against items and resize handles |
//! | [`consts`] | Shared numeric constants |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod hit;
pub mod input;
pub mod layers;
pub mod ordering;
pub mod panel;
pub mod store;

#[cfg(test)]
mod test_support;
