use std::process;

fn main() {
    process::exit(templint::cli::run());
}
