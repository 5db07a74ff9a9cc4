//! Write the TypeScript record shapes to `shared/types.ts`, or the path given
//! as the first argument. `--check` fails when the file is out of date.

use std::{env, fs, path::PathBuf, process::ExitCode};

fn main() -> ExitCode {
    let mut check = false;
    let mut path = PathBuf::from("shared/types.ts");
    for arg in env::args().skip(1) {
        if arg == "--check" {
            check = true;
        } else {
            path = PathBuf::from(arg);
        }
    }

    let generated = models::typescript::declarations();

    if check {
        let current = fs::read_to_string(&path).unwrap_or_default();
        if current == generated {
            println!("✅ {} is up to date.", path.display());
            return ExitCode::SUCCESS;
        }
        eprintln!("❌ {} is out of date. Run `cargo run -p models --bin generate_types`.", path.display());
        return ExitCode::FAILURE;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("failed to create {}: {e}", parent.display());
            return ExitCode::FAILURE;
        }
    }
    if let Err(e) = fs::write(&path, generated) {
        eprintln!("failed to write {}: {e}", path.display());
        return ExitCode::FAILURE;
    }
    println!("✅ Wrote {}", path.display());
    ExitCode::SUCCESS
}
