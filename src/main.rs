fn main() {
    if let Err(err) = crash_etl::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
