//! Transform entry point for one component source file.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::options::TransformOptions;
use crate::parse::parse_template;
use crate::patcher::apply_patches;
use crate::patches::collect_patches;
use crate::reporter::report_template_diff;
use crate::sfc::locate_template;
use crate::validate::{ErrorContext, ErrorKind, Result};

/// Extension that marks a component source file.
pub const COMPONENT_EXTENSION: &str = ".vue";

const GUARD_TOKEN: &str = "v-can";
const DENY_TOKEN: &str = "v-cannot";

/// Identity source map: the rewrite keeps line structure, so no mappings are
/// computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "napi", napi(object))]
pub struct SourceMap {
    pub version: u32,
    pub sources: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
    pub sources_content: Vec<String>,
}

impl SourceMap {
    pub fn passthrough(id: &str, code: &str) -> Self {
        SourceMap {
            version: 3,
            sources: vec![id.to_string()],
            names: Vec::new(),
            mappings: String::new(),
            sources_content: vec![code.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "napi", napi(object))]
pub struct TransformOutput {
    pub code: String,
    pub map: SourceMap,
}

pub fn is_component_file(id: &str) -> bool {
    id.ends_with(COMPONENT_EXTENSION)
}

/// Rewrite every `v-can` / `v-cannot` in the component's template.
///
/// `Ok(None)` means the source needs no change and should be used as is.
/// Validation failures abort the whole file; no partial output is produced.
pub fn transform_can(code: &str, id: &str, options: &TransformOptions) -> Result<Option<TransformOutput>> {
    if !is_component_file(id) {
        return Ok(None);
    }

    let Some(region) = locate_template(code) else {
        debug!(id, "no template block");
        return Ok(None);
    };

    let template = region.slice(code);
    if !template.contains(GUARD_TOKEN) && !template.contains(DENY_TOKEN) {
        return Ok(None);
    }

    let cwd = options
        .cwd
        .clone()
        .or_else(|| std::env::current_dir().ok());
    let ctx = ErrorContext::new(Some(id), cwd.as_deref(), code, region.start);

    let ast = parse_template(template)
        .map_err(|e| ctx.error(ErrorKind::Parse, &e.span, &e.message))?;

    let patches = collect_patches(&ast, &ctx)?;
    if patches.is_empty() {
        debug!(id, "template has no guard directives");
        return Ok(None);
    }

    let next = apply_patches(code, &patches);
    debug!(file = ctx.file(), patches = patches.len(), "rewrote v-can directives");

    if options.reporter {
        report_template_diff(code, &next, id);
    }

    Ok(Some(TransformOutput {
        map: SourceMap::passthrough(id, &next),
        code: next,
    }))
}

#[cfg(feature = "napi")]
#[napi]
pub fn transform_can_native(
    code: String,
    id: String,
    options_json: Option<String>,
) -> napi::Result<Option<TransformOutput>> {
    let options = match options_json {
        Some(json) => TransformOptions::from_json(&json)
            .map_err(|e| napi::Error::from_reason(format!("Options parse error: {}", e)))?,
        None => TransformOptions::default(),
    };
    transform_can(&code, &id, &options).map_err(|e| napi::Error::from_reason(e.to_string()))
}
