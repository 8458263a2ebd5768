// Purpose: Define crate-level module surface for the instrumentation rewriter.
// Inputs/Outputs: Re-exports internal modules for the binary, tests, and library callers.
// Invariants: Public module boundaries should remain stable for embedding build tools.
// Gotchas: Keep module wiring consistent with the src/main.rs entry path.

pub mod cli;
pub mod frontend;
pub mod rewrite;
pub mod sema;
