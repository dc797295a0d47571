//! Injected text surface.
//!
//! Everything the rewriter ever adds to a file is formatted here: the
//! runtime header include, the entry call that replaces a routine's opening
//! brace, and the exit call that replaces its closing brace. The macros are
//! expected to open/close the scope themselves; the runtime's exit handling
//! rides on C++ scope-exit semantics, which is why a body with many return
//! statements still needs exactly one injected exit.

use crate::block::Block;
use crate::domain::types::FileContext;

/// Header included at the top of every rewritten file. Its presence on the
/// first line is also how the driver recognizes an already-rewritten file.
pub const RUNTIME_HEADER: &str = "traceweave.h";

/// Implementation file pulled in after the program-entry function.
pub const RUNTIME_IMPL: &str = "traceweave.cpp";

/// Block comment marking the next function as not-to-be-instrumented.
pub const SKIP_FUNCTION_MARK: &[u8] = b"/*TRACEWEAVE_SKIP_FUNCTION*/";

/// Block comment disabling instrumentation for the rest of the file.
pub const SKIP_FILE_MARK: &[u8] = b"/*TRACEWEAVE_SKIP_FILE*/";

/// The unconditional first line of every rewritten file.
pub fn header_line() -> String {
    format!("#include \"{RUNTIME_HEADER}\"\n")
}

/// Whether this routine gets the program begin/end treatment. A
/// parameterless entry function falls back to the generic pair: the program
/// form needs a first parameter to take the address of.
pub fn is_program_entry(ctx: &FileContext, block: &Block) -> bool {
    block.name == ctx.entry_point && !block.params.is_empty()
}

/// Text replacing a routine's opening brace.
pub fn entry_text(ctx: &FileContext, block: &Block) -> String {
    if is_program_entry(ctx, block) {
        return format!(
            "TW_MAIN_BEGIN( {}, {}, &{} )",
            ctx.package, block.class_name, block.params[0].name
        );
    }
    if block.params.is_empty() {
        format!(
            "TW_FN_ENTER( {}, {}, {}, \"\" )",
            ctx.package, block.class_name, block.name
        )
    } else {
        let names: Vec<&str> = block.params.iter().map(|p| p.name.as_str()).collect();
        format!(
            "TW_FN_ENTER( {}, {}, {}, \"{}\", {} )",
            ctx.package,
            block.class_name,
            block.name,
            block.signature(),
            names.join(", ")
        )
    }
}

/// Text replacing a routine's closing brace. The program-entry exit also
/// pulls in the deferred runtime support text.
pub fn exit_text(ctx: &FileContext, block: &Block) -> String {
    if is_program_entry(ctx, block) {
        format!("TW_MAIN_END()\n#include \"{RUNTIME_IMPL}\"")
    } else {
        "TW_FN_LEAVE()".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Param;
    use crate::domain::types::Config;

    fn ctx() -> FileContext {
        FileContext::new(&Config::default(), "pkg", "Class")
    }

    fn with_params(mut block: Block, params: &[(&str, &str)]) -> Block {
        block.params = params
            .iter()
            .map(|(n, t)| Param { name: (*n).to_string(), ty: (*t).to_string() })
            .collect();
        block
    }

    #[test]
    fn test_entry_with_params() {
        let block =
            with_params(Block::function("foo", "Class"), &[("a", "int"), ("b", "char*")]);
        assert_eq!(
            entry_text(&ctx(), &block),
            "TW_FN_ENTER( pkg, Class, foo, \"a:int,b:char*\", a, b )"
        );
        assert_eq!(exit_text(&ctx(), &block), "TW_FN_LEAVE()");
    }

    #[test]
    fn test_entry_without_params_omits_name_list() {
        let block = Block::function("tick", "Class");
        assert_eq!(entry_text(&ctx(), &block), "TW_FN_ENTER( pkg, Class, tick, \"\" )");
    }

    #[test]
    fn test_method_uses_owning_class() {
        let block = with_params(Block::method("run", "Engine"), &[("n", "int")]);
        assert_eq!(
            entry_text(&ctx(), &block),
            "TW_FN_ENTER( pkg, Engine, run, \"n:int\", n )"
        );
    }

    #[test]
    fn test_program_entry_takes_first_param_address() {
        let block = with_params(
            Block::function("main", "Class"),
            &[("argc", "int"), ("argv", "char**")],
        );
        assert_eq!(entry_text(&ctx(), &block), "TW_MAIN_BEGIN( pkg, Class, &argc )");
        assert_eq!(
            exit_text(&ctx(), &block),
            "TW_MAIN_END()\n#include \"traceweave.cpp\""
        );
    }

    #[test]
    fn test_parameterless_entry_function_is_generic() {
        let block = Block::function("main", "Class");
        assert!(!is_program_entry(&ctx(), &block));
        assert_eq!(entry_text(&ctx(), &block), "TW_FN_ENTER( pkg, Class, main, \"\" )");
        assert_eq!(exit_text(&ctx(), &block), "TW_FN_LEAVE()");
    }
}
