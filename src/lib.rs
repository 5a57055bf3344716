#![doc(html_root_url = "https://docs.rs/reactables-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Client runtime for Reactables components: server-rendered regions of a page that keep a data model in sync with the server.
//!
//! Markup declares behavior through `r:*` attributes (see [`attributes`]). A [`Runtime`] discovers component roots, each
//! [`Component`] binds its own scope, sends its state on interaction and reconciles the live DOM against the markup the
//! server renders in response.

pub mod action;
pub mod attributes;
pub mod binder;
pub mod codec;
pub mod component;
pub mod debounce;
pub mod element_table;
pub mod error;
pub mod interop;
pub mod js;
pub mod loading;
pub mod markup;
pub mod options;
pub mod overlay;
pub mod path;
pub mod reconcile;
pub mod runtime;
pub mod scope;
pub mod sync;
pub mod wire;

pub use action::ActionCall;
pub use component::{Component, EventContext, Listener};
pub use error::{InitError, MarkupError, SyncError};
pub use options::Options;
pub use path::ModelPath;
pub use runtime::Runtime;
pub use sync::{SyncRequest, Transport, XhrTransport};
pub use wire::{Render, SyncOutcome};
