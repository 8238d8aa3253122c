use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use halite_core::{self, Diagnostic, FormatConfig};

const SOURCE_EXTENSIONS: &[&str] = &["lisp", "lsp", "cl", "asd"];

#[derive(Parser)]
#[command(name = "halite")]
#[command(about = "A structural formatter for Lisp source files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format Lisp source files
    Fmt {
        /// Path to a file or directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Check if files are formatted (don't modify)
        #[arg(long, short)]
        check: bool,

        /// Show diff of formatting changes
        #[arg(long)]
        diff: bool,

        /// Recursively format all Lisp files in directory
        #[arg(long, short)]
        recursive: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fmt {
            path,
            check,
            diff,
            recursive,
        } => run_fmt(&path, check, diff, recursive),
        Commands::Completions { shell } => {
            run_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "halite", &mut io::stdout());
}

fn run_fmt(path: &PathBuf, check: bool, show_diff: bool, recursive: bool) -> Result<(), String> {
    let config = FormatConfig::default();

    let files = if path.is_file() {
        vec![path.clone()]
    } else if recursive {
        find_lisp_files_recursive(path)?
    } else {
        find_lisp_files_in_dir(path)?
    };

    if files.is_empty() {
        println!("{}", "No Lisp files found.".yellow());
        return Ok(());
    }

    let mut needs_formatting = Vec::new();
    let mut errors = Vec::new();

    for file in &files {
        let content = fs::read_to_string(file)
            .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;

        match halite_core::format(&content, &config) {
            Ok(result) => {
                print_diagnostics(file, &content, &result.diagnostics);

                if content != result.text {
                    needs_formatting.push(file.clone());

                    if show_diff {
                        print_diff(file, &content, &result.text);
                    }

                    if !check {
                        fs::write(file, &result.text)
                            .map_err(|e| format!("Failed to write {}: {}", file.display(), e))?;
                        println!("{} {}", "Formatted:".green(), file.display());
                    }
                }
            }
            Err(e) => {
                errors.push((file.clone(), e.to_string()));
            }
        }
    }

    // Print summary
    if check {
        if needs_formatting.is_empty() && errors.is_empty() {
            println!("{}", "All files are properly formatted.".green());
            Ok(())
        } else {
            if !needs_formatting.is_empty() {
                println!("{}", "The following files need formatting:".yellow());
                for file in &needs_formatting {
                    println!("  {}", file.display());
                }
            }
            for (file, err) in &errors {
                eprintln!("{} {}: {}", "Error:".red(), file.display(), err);
            }
            Err("Some files are not properly formatted".to_string())
        }
    } else if !errors.is_empty() {
        for (file, err) in &errors {
            eprintln!("{} {}: {}", "Error:".red(), file.display(), err);
        }
        Err("Some files had formatting errors".to_string())
    } else {
        let count = needs_formatting.len();
        if count > 0 {
            println!("{}", format!("Formatted {} file(s).", count).green().bold());
        } else {
            println!("{}", "All files are already properly formatted.".green());
        }
        Ok(())
    }
}

fn print_diagnostics(file: &Path, content: &str, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let (line, column) = diagnostic.line_col(content);
        eprintln!(
            "{} {}:{}:{}: {}",
            "Warning:".yellow(),
            file.display(),
            line,
            column,
            diagnostic.message
        );
    }
}

fn is_lisp_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn find_lisp_files_recursive(dir: &PathBuf) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    collect_lisp_files_recursive(dir, &mut files)?;
    Ok(files)
}

fn collect_lisp_files_recursive(dir: &PathBuf, files: &mut Vec<PathBuf>) -> Result<(), String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();

        if path.is_dir() {
            // Skip hidden directories and common non-source directories
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            if !name.starts_with('.') && name != "target" {
                collect_lisp_files_recursive(&path, files)?;
            }
        } else if is_lisp_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}

fn find_lisp_files_in_dir(dir: &PathBuf) -> Result<Vec<PathBuf>, String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        if is_lisp_file(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

fn print_diff(file: &Path, original: &str, formatted: &str) {
    println!("\n{} {}:", "Diff for".cyan().bold(), file.display());

    let diff = TextDiff::from_lines(original, formatted);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_lisp_file() {
        assert!(is_lisp_file(Path::new("foo.lisp")));
        assert!(is_lisp_file(Path::new("system.asd")));
        assert!(!is_lisp_file(Path::new("foo.rs")));
        assert!(!is_lisp_file(Path::new("lisp")));
    }

    #[test]
    fn test_run_fmt_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messy.lisp");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, "(foo   1)").unwrap();
        drop(f);

        run_fmt(&path, false, false, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "(foo 1)\n");
    }

    #[test]
    fn test_run_fmt_check_mode_does_not_modify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messy.lisp");
        fs::write(&path, "(foo   1)").unwrap();

        let result = run_fmt(&path, true, false, false);
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "(foo   1)");
    }

    #[test]
    fn test_run_fmt_check_mode_passes_on_formatted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidy.lisp");
        fs::write(&path, "(foo 1)\n").unwrap();

        assert!(run_fmt(&path, true, false, false).is_ok());
    }

    #[test]
    fn test_find_files_recursive_skips_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("a.lisp"), "(a)\n").unwrap();
        fs::write(dir.path().join("sub/b.cl"), "(b)\n").unwrap();
        fs::write(dir.path().join(".git/c.lisp"), "(c)\n").unwrap();

        let files = find_lisp_files_recursive(&dir.path().to_path_buf()).unwrap();
        assert_eq!(files.len(), 2);
    }
}
