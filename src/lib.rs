//! # v-can template compiler
//!
//! Rewrites the `v-can` / `v-cannot` permission directives of Vue single-file
//! components into plain `v-if` / `v-else-if` conditions that call the runtime
//! guard function `__can__`.
//!
//! ## Pipeline
//!
//! 1. **Eligibility**: only `.vue` ids are considered.
//! 2. **Isolation**: the `<template>` block is located; everything else in the
//!    file is left untouched.
//! 3. **Parsing**: the template is parsed into an arena tree with byte spans.
//! 4. **Chain linking**: `v-if` / `v-else-if` / `v-else` runs that carry a
//!    `v-can` share one permission path; members without their own guard
//!    inherit it.
//! 5. **Patch generation**: every guarded, denied or inheriting element yields
//!    text patches.
//! 6. **Application**: patches are applied to the whole source from the end
//!    backwards.
//!
//! ## Rewrite rules
//!
//! - `v-can="can.a.b"` becomes `v-if="__can__('a', 'b')"`.
//! - `v-can` next to `v-if="x"` becomes `v-if="(x) && __can__('a', 'b')"`.
//! - A `v-else` member of a guarded chain becomes `v-else-if="__can__('a', 'b')"`.
//! - `v-cannot` becomes `v-if="!(__can__('a', 'b'))"`, denying either its own
//!   path or the guard of the sibling right before it.
//!
//! Every validation failure aborts the file with a [`CanError`] carrying the
//! file, line and column of the offending directive.

mod chains;
mod condition;
mod directives;
mod discovery;
mod ir;
mod options;
mod parse;
mod patcher;
mod patches;
mod permission;
mod reporter;
mod sfc;
mod transform;
mod validate;
mod visitor;


pub use discovery::{transform_project, FileError, FileOutcome, FileStatus};
pub use options::{ModuleOptions, TransformOptions, CONFIG_KEY, MODULE_NAME};
pub use patcher::{apply_patches, Patch};
pub use permission::{parse_permission_expression, PathError, PermissionPath, GUARD_FUNCTION};
pub use reporter::report_template_diff;
pub use sfc::{locate_template, TemplateRegion};
pub use transform::{is_component_file, transform_can, SourceMap, TransformOutput};
pub use validate::*;

#[cfg(feature = "napi")]
pub use transform::transform_can_native;
