//! Binary entrypoint for phonejs

fn main() {
    if let Err(err) = phonejs_cli::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
