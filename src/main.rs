// Purpose: Provide the binary entry for rewriter-oriented CLI execution.
// Inputs/Outputs: Reads process args and returns process exit code from the CLI dispatcher.
// Invariants: Main must not bypass centralized CLI argument/diagnostic handling.
// Gotchas: Keep behavior aligned with the library surface to avoid drift for embedders.

fn main() {
    let code = moriarty::cli::run_cli(std::env::args().skip(1));
    std::process::exit(code);
}
