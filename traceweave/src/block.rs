//! Block model for the nesting stack.
//!
//! A [`Block`] is one tracked lexical scope: the file itself (the
//! declaration root), a class body, a function or method body, a
//! conditional-compilation group, or a plain braced statement. Blocks live
//! on a LIFO stack owned by the translator; a block under construction (a
//! signature being read ahead of its `{`) hangs off its enclosing block as
//! an owned *candidate* until it is either committed by `{` or discarded by
//! `;`.

/// The kinds of tracked scope.
///
/// `Template` is declared for completeness but no scanner rule constructs
/// it; template headers flow through the ordinary token rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Statement,
    Class,
    Method,
    Function,
    Template,
    Declaration,
    Conditional,
}

/// One collected parameter: name plus type text including any accumulated
/// pointer/array qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

/// One entry of the nesting stack (or a pending candidate for one).
#[derive(Debug)]
pub struct Block {
    pub kind: BlockKind,
    /// Identifier naming the scope; empty for anonymous blocks.
    pub name: String,
    /// Owning class for methods; the file class for free functions.
    pub class_name: String,
    /// Signature speculatively being read inside this scope, not yet
    /// committed to the stack.
    pub candidate: Option<Box<Block>>,
    /// Parameter list still being collected (between `(` and `)`).
    pub collecting: Option<Vec<Param>>,
    /// Parameter list frozen at `)`.
    pub params: Vec<Param>,
    /// Whether bytes inside this conditional group are structurally
    /// interpreted; always true for non-conditional blocks.
    pub enabled: bool,
    /// One-shot flag: some branch of this conditional group has already
    /// been the enabled one.
    taken: bool,
    /// Body marked by a skip sentinel; entry/exit braces stay literal.
    pub skipped: bool,
}

impl Block {
    fn new(kind: BlockKind, name: &str, class_name: &str) -> Self {
        Block {
            kind,
            name: name.to_string(),
            class_name: class_name.to_string(),
            candidate: None,
            collecting: None,
            params: Vec::new(),
            enabled: true,
            taken: false,
            skipped: false,
        }
    }

    /// The declaration root representing the whole file.
    pub fn root(class_name: &str) -> Self {
        Block::new(BlockKind::Declaration, class_name, class_name)
    }

    /// An anonymous braced statement (loop body, initializer list, ...).
    pub fn statement() -> Self {
        Block::new(BlockKind::Statement, "", "")
    }

    /// A class declaration candidate.
    pub fn class(name: &str) -> Self {
        Block::new(BlockKind::Class, name, name)
    }

    /// A method candidate with an open parameter list.
    pub fn method(name: &str, class_name: &str) -> Self {
        let mut block = Block::new(BlockKind::Method, name, class_name);
        block.collecting = Some(Vec::new());
        block
    }

    /// A free-function candidate with an open parameter list.
    pub fn function(name: &str, class_name: &str) -> Self {
        let mut block = Block::new(BlockKind::Function, name, class_name);
        block.collecting = Some(Vec::new());
        block
    }

    /// A conditional-compilation group whose first branch has condition
    /// `on` (already combined with the enclosing state by the caller).
    pub fn conditional(name: &str, on: bool) -> Self {
        let mut block = Block::new(BlockKind::Conditional, name, "");
        block.branch_select(on);
        block
    }

    /// Whether this block is a function or method body.
    pub fn is_routine(&self) -> bool {
        matches!(self.kind, BlockKind::Method | BlockKind::Function)
    }

    /// Switch to the next branch of a conditional group. The first branch
    /// whose condition holds wins; every later sibling stays disabled even
    /// if its own condition would hold.
    pub fn branch_select(&mut self, on: bool) {
        if on && !self.taken {
            self.taken = true;
            self.enabled = true;
        } else {
            self.enabled = false;
        }
    }

    /// The comma-joined `name:type` signature of the frozen parameters.
    pub fn signature(&self) -> String {
        self.params
            .iter()
            .map(|p| format!("{}:{}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Whether structural interpretation is on at the current stack state: the
/// innermost open conditional decides; with none open, it always is.
pub fn branch_enabled(stack: &[Block]) -> bool {
    stack
        .iter()
        .rev()
        .find(|b| b.kind == BlockKind::Conditional)
        .is_none_or(|b| b.enabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_select_first_match_wins() {
        let mut block = Block::conditional("FOO", false);
        assert!(!block.enabled);

        // #elif with a true condition: becomes the taken branch.
        block.branch_select(true);
        assert!(block.enabled);

        // #else can no longer win.
        block.branch_select(true);
        assert!(!block.enabled);
    }

    #[test]
    fn test_conditional_enabled_branch_blocks_later_siblings() {
        let mut block = Block::conditional("FOO", true);
        assert!(block.enabled);
        block.branch_select(true);
        assert!(!block.enabled);
        block.branch_select(true);
        assert!(!block.enabled);
    }

    #[test]
    fn test_branch_enabled_consults_innermost_conditional() {
        let mut stack = vec![Block::root("File")];
        assert!(branch_enabled(&stack));

        stack.push(Block::conditional("A", false));
        assert!(!branch_enabled(&stack));

        // A routine pushed above the conditional does not mask it.
        stack.push(Block::function("f", "File"));
        assert!(!branch_enabled(&stack));

        stack.remove(1);
        assert!(branch_enabled(&stack));
    }

    #[test]
    fn test_signature_joins_params() {
        let mut block = Block::function("foo", "File");
        block.params = vec![
            Param { name: "a".into(), ty: "int".into() },
            Param { name: "b".into(), ty: "char*".into() },
        ];
        assert_eq!(block.signature(), "a:int,b:char*");
        assert!(block.is_routine());
    }
}
