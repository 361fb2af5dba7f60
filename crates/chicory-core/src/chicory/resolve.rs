use super::ChicoryOptions;
use crate::plugin::{HookContext, HookResult, ResolveIdResult, ResolveOptions};

/// What the resolver decided for one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Not ours; the host's resolution chain carries on.
    Decline,
    /// Already marked: whatever the rest of the pipeline said, unchanged.
    PassThrough(Option<ResolveIdResult>),
    /// A claimed file, rewritten to its marked id.
    Resolved(ResolveIdResult),
}

impl ResolveOutcome {
    /// The hook return value for this outcome.
    #[must_use]
    pub fn into_hook_result(self) -> Option<ResolveIdResult> {
        match self {
            Self::Decline => None,
            Self::PassThrough(result) => result,
            Self::Resolved(result) => Some(result),
        }
    }
}

/// Decide how to resolve `specifier`.
///
/// Nested resolutions skip the calling plugin. A claimed file that cannot be
/// found, or that resolves as external, is declined so the host reports it in
/// its own terms. Errors only come from other plugins in the nested
/// resolution.
pub fn resolve_sentinel(
    options: &ChicoryOptions,
    specifier: &str,
    importer: Option<&str>,
    ctx: &HookContext<'_>,
) -> HookResult<ResolveOutcome> {
    let nested = ResolveOptions { skip_self: true };

    if options.is_marked(specifier) {
        let result = ctx.resolve(specifier, importer, nested)?;
        return Ok(ResolveOutcome::PassThrough(result));
    }

    if !options.claims(specifier) {
        return Ok(ResolveOutcome::Decline);
    }

    match ctx.resolve(specifier, importer, nested)? {
        Some(resolved) if !resolved.external => Ok(ResolveOutcome::Resolved(ResolveIdResult {
            id: options.mark(&resolved.id),
            external: false,
            meta: resolved.meta,
        })),
        _ => Ok(ResolveOutcome::Decline),
    }
}
