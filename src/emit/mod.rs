//! Makefile emission.
//!
//! - [`wrap_tokens`]: continuation-line formatter for long token lists
//! - [`write_makefile`]: full Makefile for a scheduled project

pub mod makefile;
pub mod wrap;

pub use makefile::{object_name, render_makefile, write_makefile, MakefileHeader, RECIPES};
pub use wrap::{wrap_tokens, WrapOptions};
