//! rfpflow server binary
//!
//! All logic is in the library; main.rs only invokes `cli::run()`.

fn main() {
    // cli::run() prints its own errors; main only maps to process exit
    if let Err(code) = rfpflow::cli::run() {
        std::process::exit(code.as_i32());
    }
}
