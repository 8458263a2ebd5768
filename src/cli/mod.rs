use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::frontend::printer::print_file;
use crate::rewrite::{Config, Rewriter};

pub fn run_cli<I>(args: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let first = match args.next() {
        Some(arg) => arg,
        None => {
            print_usage();
            return 1;
        }
    };
    if first == "instrument" {
        return run_instrument(args);
    }
    run_single(first, args)
}

// moriarty <input> [-o output] [--config cfg.json] [-v]
fn run_single<I>(input: String, mut args: I) -> i32
where
    I: Iterator<Item = String>,
{
    let mut output: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut verbose = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" => match args.next() {
                Some(path) => output = Some(PathBuf::from(path)),
                None => {
                    eprintln!("expected output path after -o");
                    return 1;
                }
            },
            "--config" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => {
                    eprintln!("expected config path after --config");
                    return 1;
                }
            },
            "-v" => verbose = true,
            other => {
                eprintln!("unknown argument: {}", other);
                return 1;
            }
        }
    }

    let result = (|| -> Result<()> {
        let config = load_config(config_path.as_deref())?;
        let mut rewriter = Rewriter::new(config)?;
        let input_path = PathBuf::from(&input);
        let file = rewriter.instrument_file(&input_path, None)?;
        if verbose {
            for note in rewriter.resolver_notes() {
                eprintln!("note: {}", note.message);
            }
        }
        let text = print_file(&file);
        match output {
            Some(path) => fs::write(&path, text)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => print!("{}", text),
        }
        Ok(())
    })();
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    }
}

// moriarty instrument -i a.go -i b.go [-p postfix] [-f] [--config cfg.json] [-v]
fn run_instrument<I>(mut args: I) -> i32
where
    I: Iterator<Item = String>,
{
    let mut inputs: Vec<PathBuf> = Vec::new();
    let mut postfix = "_moriarty".to_string();
    let mut force = false;
    let mut config_path: Option<PathBuf> = None;
    let mut verbose = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-i" => match args.next() {
                Some(path) => inputs.push(PathBuf::from(path)),
                None => {
                    eprintln!("expected input path after -i");
                    return 1;
                }
            },
            "-p" => match args.next() {
                Some(value) => postfix = value,
                None => {
                    eprintln!("expected postfix after -p");
                    return 1;
                }
            },
            "-f" => force = true,
            "--config" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => {
                    eprintln!("expected config path after --config");
                    return 1;
                }
            },
            "-v" => verbose = true,
            other => {
                eprintln!("unknown argument: {}", other);
                return 1;
            }
        }
    }
    if inputs.is_empty() {
        print_usage();
        return 1;
    }

    let result = (|| -> Result<()> {
        let config = load_config(config_path.as_deref())?;
        let mut rewriter = Rewriter::new(config)?;
        let files = rewriter.instrument_files(&inputs)?;
        if verbose {
            for note in rewriter.resolver_notes() {
                eprintln!("note: {}", note.message);
            }
        }
        for (input, file) in inputs.iter().zip(&files) {
            let output = sibling_with_postfix(input, &postfix);
            if output.exists() && !force {
                eprintln!(
                    "skipping {} (exists; use -f to overwrite)",
                    output.display()
                );
                continue;
            }
            fs::write(&output, print_file(file))
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        Ok(())
    })();
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Config = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

// a/b/main.go with postfix "_moriarty" becomes a/b/main_moriarty.go.
fn sibling_with_postfix(input: &Path, postfix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    let ext = input.extension().and_then(|s| s.to_str());
    let name = match ext {
        Some(ext) => format!("{}{}.{}", stem, postfix, ext),
        None => format!("{}{}", stem, postfix),
    };
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

fn print_usage() {
    eprintln!("usage: moriarty <input> [-o output] [--config cfg.json] [-v]");
    eprintln!("   or: moriarty instrument -i <input>... [-p postfix] [-f] [--config cfg.json] [-v]");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postfix_lands_before_the_extension() {
        let out = sibling_with_postfix(Path::new("pkg/main.go"), "_moriarty");
        assert_eq!(out, PathBuf::from("pkg/main_moriarty.go"));
    }

    #[test]
    fn postfix_without_extension_appends() {
        let out = sibling_with_postfix(Path::new("script"), "_x");
        assert_eq!(out, PathBuf::from("script_x"));
    }
}
