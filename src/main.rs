fn main() {
    if let Err(err) = import_mapper::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
