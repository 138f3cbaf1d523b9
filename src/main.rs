fn main() {
    if let Err(err) = concept_map_engine::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
