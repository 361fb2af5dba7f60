use super::{ChicoryError, ChicoryOptions};
use crate::compiler::Compiler;
use crate::plugin::{LoadResult, TransformResult};
use std::path::Path;

/// What the loader decided for one id.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Not a marked id; the host loads it normally.
    Decline,
    /// The compiled body, exactly as the compiler returned it.
    Loaded(LoadResult),
    /// The claimed file has no valid body. The build must stop.
    Fatal(ChicoryError),
}

/// What the single-hook transform decided for one module.
#[derive(Debug)]
pub enum TransformOutcome {
    Decline,
    /// Compiled code, with no source map.
    Transformed(TransformResult),
    Fatal(ChicoryError),
}

/// Produce the body of a marked id: strip the marker, read, compile.
///
/// An id that names an existing file is declined even when it carries the
/// marked suffix, so an on-disk `Foo.chic.jsx` loads as itself.
///
/// Nothing is retried; the compiler is deterministic and would fail the same
/// way on the same text.
pub fn load_sentinel(options: &ChicoryOptions, compiler: &dyn Compiler, id: &str) -> LoadOutcome {
    let Some(path) = options.strip(id) else {
        return LoadOutcome::Decline;
    };
    // a real file that happens to end in the marked suffix is not ours
    if Path::new(id).is_file() {
        return LoadOutcome::Decline;
    }

    let source = match chicory_util::fs::read_source(Path::new(path)) {
        Ok(source) => source,
        Err(source) => {
            return LoadOutcome::Fatal(ChicoryError::Read {
                path: path.to_string(),
                source,
            })
        }
    };

    match compiler.compile(&source) {
        Ok(output) => LoadOutcome::Loaded(LoadResult {
            code: output.code,
            map: output.map,
        }),
        Err(source) => LoadOutcome::Fatal(ChicoryError::Compile {
            path: path.to_string(),
            source,
        }),
    }
}

/// Replace the body of a claimed module with its compiled form.
pub fn transform_sentinel(
    options: &ChicoryOptions,
    compiler: &dyn Compiler,
    code: &str,
    id: &str,
) -> TransformOutcome {
    if !options.claims(id) {
        return TransformOutcome::Decline;
    }

    match compiler.compile(code) {
        Ok(output) => TransformOutcome::Transformed(TransformResult::code(output.code)),
        Err(source) => TransformOutcome::Fatal(ChicoryError::Compile {
            path: id.to_string(),
            source,
        }),
    }
}
