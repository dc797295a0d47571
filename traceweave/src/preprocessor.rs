//! Conditional-compilation evaluation.
//!
//! Directive lines are copied to the output verbatim like any other span;
//! this module only interprets their effect on the nesting stack so braces
//! are counted in exactly one branch of every conditional group. The
//! recognized subset is deliberately small: `#if defined(NAME)`,
//! `#ifdef`/`#ifndef NAME`, bare `#if NAME` (true only for the literal `1`),
//! `#elif NAME`, `#else`, `#define NAME` and `#endif`. Anything else
//! (`#include`, `#pragma`, `#undef`, expression conditions) is structurally
//! inert: the line passes through and the stack is untouched. That is a
//! documented precision trade, not an oversight; an unrecognized `#if` form
//! simply never opens a group, so its `#endif` is ignored as unmatched.

use log::debug;
use regex::Regex;

use crate::block::{branch_enabled, Block, BlockKind};
use crate::domain::types::FileContext;

/// Compiled directive patterns, built once per translator.
///
/// The `\W*` separators are loose on purpose: they accept decorated forms
/// like `#  ifdef NAME` or `#if (NAME)` and, matching only the first symbol,
/// reduce `#if defined(A) && defined(B)` to its first operand.
pub struct DirectiveSet {
    if_defined: Regex,
    ifdef: Regex,
    ifndef: Regex,
    if_plain: Regex,
    elif: Regex,
    else_: Regex,
    define: Regex,
    endif: Regex,
}

impl DirectiveSet {
    pub fn new() -> Self {
        DirectiveSet {
            if_defined: Regex::new(r"^#\s*if\s+defined\W*(\w+)").unwrap(),
            ifdef: Regex::new(r"^#\s*ifdef\W*(\w+)").unwrap(),
            ifndef: Regex::new(r"^#\s*ifndef\W*(\w+)").unwrap(),
            if_plain: Regex::new(r"^#\s*if\W*(\w+)").unwrap(),
            elif: Regex::new(r"^#\s*elif\W*(\w+)").unwrap(),
            else_: Regex::new(r"^#\s*else").unwrap(),
            define: Regex::new(r"^#\s*define\W*(\w+)").unwrap(),
            endif: Regex::new(r"^#\s*endif").unwrap(),
        }
    }

    /// Apply one directive line to the stack and define set.
    ///
    /// `text` is the full directive span including the leading `#`; `line`
    /// is only used for logging.
    pub fn evaluate(
        &self,
        text: &str,
        stack: &mut Vec<Block>,
        ctx: &mut FileContext,
        line: usize,
    ) {
        if self.endif.is_match(text) {
            close_group(stack, line);
            return;
        }

        // New conditional group: enabled is the AND of the enclosing state
        // and the branch's own condition.
        let parent_on = branch_enabled(stack);
        if let Some(name) = self
            .if_defined
            .captures(text)
            .or_else(|| self.ifdef.captures(text))
            .map(|c| c[1].to_string())
        {
            let on = parent_on && ctx.defines.contains(&name);
            stack.push(Block::conditional(&name, on));
            return;
        }
        if let Some(c) = self.ifndef.captures(text) {
            let on = parent_on && !ctx.defines.contains(&c[1]);
            stack.push(Block::conditional(&c[1], on));
            return;
        }
        if let Some(c) = self.if_plain.captures(text) {
            // No expression evaluation: a bare #if is live only for the
            // literal token 1.
            let on = parent_on && &c[1] == "1";
            stack.push(Block::conditional("", on));
            return;
        }

        if let Some(c) = self.elif.captures(text) {
            let cond = ctx.defines.contains(&c[1]);
            next_branch(stack, cond, line);
            return;
        }
        if self.else_.is_match(text) {
            next_branch(stack, true, line);
            return;
        }

        if let Some(c) = self.define.captures(text) {
            if branch_enabled(stack) {
                ctx.defines.insert(c[1].to_string());
            }
            return;
        }

        debug!("line {line}: directive outside recognized subset: {}", text.trim_end());
    }
}

/// `#elif`/`#else`: move the innermost open group to its next branch,
/// first-match-wins. The condition is ANDed with the state enclosing the
/// group so no branch of a group nested in dead code ever comes alive.
fn next_branch(stack: &mut [Block], cond: bool, line: usize) {
    let Some(pos) = stack.iter().rposition(|b| b.kind == BlockKind::Conditional) else {
        debug!("line {line}: #elif/#else without open conditional, ignored");
        return;
    };
    let enclosing_on = branch_enabled(&stack[..pos]);
    stack[pos].branch_select(enclosing_on && cond);
}

/// `#endif`: close the innermost open group wherever it sits. Blocks opened
/// inside the taken branch stay on the stack, and a signature candidate
/// still pending on the group is adopted by its parent, so a group
/// straddling a function head keeps its entry/exit pairing.
fn close_group(stack: &mut Vec<Block>, line: usize) {
    let Some(pos) = stack.iter().rposition(|b| b.kind == BlockKind::Conditional) else {
        debug!("line {line}: #endif without open conditional, ignored");
        return;
    };
    let was_top = pos == stack.len() - 1;
    let group = stack.remove(pos);
    if was_top {
        if let Some(parent) = stack.last_mut() {
            if parent.candidate.is_none() {
                parent.candidate = group.candidate;
            }
        }
    }
}

impl Default for DirectiveSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Config;

    fn setup() -> (DirectiveSet, Vec<Block>, FileContext) {
        let directives = DirectiveSet::new();
        let stack = vec![Block::root("Class")];
        let ctx = FileContext::new(&Config::default(), "pkg", "Class");
        (directives, stack, ctx)
    }

    #[test]
    fn test_ifdef_of_undefined_symbol_disables() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#ifdef FOO\n", &mut stack, &mut ctx, 1);
        assert_eq!(stack.len(), 2);
        assert!(!branch_enabled(&stack));
        d.evaluate("#endif\n", &mut stack, &mut ctx, 2);
        assert_eq!(stack.len(), 1);
        assert!(branch_enabled(&stack));
    }

    #[test]
    fn test_ifdef_of_builtin_symbol_enables() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#ifdef TRACEWEAVE\n", &mut stack, &mut ctx, 1);
        assert!(branch_enabled(&stack));
    }

    #[test]
    fn test_ifndef_inverts() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#ifndef FOO\n", &mut stack, &mut ctx, 1);
        assert!(branch_enabled(&stack));
    }

    #[test]
    fn test_if_defined_parenthesized() {
        let (d, mut stack, mut ctx) = setup();
        ctx.defines.insert("FOO".to_string());
        d.evaluate("#if defined(FOO)\n", &mut stack, &mut ctx, 1);
        assert!(branch_enabled(&stack));
    }

    #[test]
    fn test_bare_if_is_literal_one_only() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#if 1\n", &mut stack, &mut ctx, 1);
        assert!(branch_enabled(&stack));
        d.evaluate("#endif\n", &mut stack, &mut ctx, 2);

        d.evaluate("#if 0\n", &mut stack, &mut ctx, 3);
        assert!(!branch_enabled(&stack));
        d.evaluate("#endif\n", &mut stack, &mut ctx, 4);

        // Defined symbols do not help a bare #if.
        d.evaluate("#if TRACEWEAVE\n", &mut stack, &mut ctx, 5);
        assert!(!branch_enabled(&stack));
    }

    #[test]
    fn test_else_takes_over_when_if_failed() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#ifdef FOO\n", &mut stack, &mut ctx, 1);
        assert!(!branch_enabled(&stack));
        d.evaluate("#else\n", &mut stack, &mut ctx, 2);
        assert!(branch_enabled(&stack));
    }

    #[test]
    fn test_first_match_wins_across_elif_chain() {
        let (d, mut stack, mut ctx) = setup();
        ctx.defines.insert("A".to_string());
        ctx.defines.insert("B".to_string());

        d.evaluate("#ifdef A\n", &mut stack, &mut ctx, 1);
        assert!(branch_enabled(&stack));
        // B is defined too, but A already won this group.
        d.evaluate("#elif B\n", &mut stack, &mut ctx, 2);
        assert!(!branch_enabled(&stack));
        d.evaluate("#else\n", &mut stack, &mut ctx, 3);
        assert!(!branch_enabled(&stack));
    }

    #[test]
    fn test_elif_wins_when_if_failed() {
        let (d, mut stack, mut ctx) = setup();
        ctx.defines.insert("B".to_string());
        d.evaluate("#ifdef A\n", &mut stack, &mut ctx, 1);
        d.evaluate("#elif B\n", &mut stack, &mut ctx, 2);
        assert!(branch_enabled(&stack));
        d.evaluate("#else\n", &mut stack, &mut ctx, 3);
        assert!(!branch_enabled(&stack));
    }

    #[test]
    fn test_no_branch_alive_under_disabled_parent() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#ifdef DEAD\n", &mut stack, &mut ctx, 1);
        d.evaluate("#ifdef TRACEWEAVE\n", &mut stack, &mut ctx, 2);
        assert!(!branch_enabled(&stack));
        d.evaluate("#else\n", &mut stack, &mut ctx, 3);
        assert!(!branch_enabled(&stack));
        d.evaluate("#endif\n", &mut stack, &mut ctx, 4);
        d.evaluate("#else\n", &mut stack, &mut ctx, 5);
        assert!(branch_enabled(&stack));
    }

    #[test]
    fn test_define_only_from_enabled_branch() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#ifdef FOO\n", &mut stack, &mut ctx, 1);
        d.evaluate("#define DEAD_SYMBOL\n", &mut stack, &mut ctx, 2);
        d.evaluate("#endif\n", &mut stack, &mut ctx, 3);
        assert!(!ctx.defines.contains("DEAD_SYMBOL"));

        d.evaluate("#define LIVE_SYMBOL\n", &mut stack, &mut ctx, 4);
        assert!(ctx.defines.contains("LIVE_SYMBOL"));

        d.evaluate("#ifdef LIVE_SYMBOL\n", &mut stack, &mut ctx, 5);
        assert!(branch_enabled(&stack));
    }

    #[test]
    fn test_endif_closes_innermost_group_under_open_block() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#else\n", &mut stack, &mut ctx, 1); // unmatched: inert
        d.evaluate("#endif\n", &mut stack, &mut ctx, 2); // unmatched: inert
        assert_eq!(stack.len(), 1);

        d.evaluate("#ifdef TRACEWEAVE\n", &mut stack, &mut ctx, 3);
        stack.push(Block::function("f", "Class"));
        d.evaluate("#endif\n", &mut stack, &mut ctx, 4);
        // The function body survives; the group is gone.
        assert_eq!(stack.len(), 2);
        assert_eq!(stack[1].kind, BlockKind::Function);
    }

    #[test]
    fn test_endif_hands_pending_candidate_to_parent() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#ifndef FOO\n", &mut stack, &mut ctx, 1);
        stack
            .last_mut()
            .unwrap()
            .candidate = Some(Box::new(Block::function("f", "Class")));
        d.evaluate("#endif\n", &mut stack, &mut ctx, 2);
        assert_eq!(stack.len(), 1);
        let cand = stack[0].candidate.as_deref().expect("candidate adopted");
        assert_eq!(cand.name, "f");
    }

    #[test]
    fn test_unrecognized_directives_are_inert() {
        let (d, mut stack, mut ctx) = setup();
        d.evaluate("#include <stdio.h>\n", &mut stack, &mut ctx, 1);
        d.evaluate("#pragma once\n", &mut stack, &mut ctx, 2);
        d.evaluate("#undef TRACEWEAVE\n", &mut stack, &mut ctx, 3);
        assert_eq!(stack.len(), 1);
        assert!(ctx.defines.contains("TRACEWEAVE"));
    }
}
