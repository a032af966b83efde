use ructe::Ructe;
use std::{fs::read_dir, path::Path};

fn main() {
    Ructe::from_env()
        .expect("This must be run with cargo")
        .compile_templates("templates")
        .expect("compile templates");

    for entry in read_dir(Path::new("static").join("css")).expect("Couldn't read static/css") {
        let path = entry.expect("Couldn't read static/css").path();
        println!("cargo:rerun-if-changed={}", path.display());
    }
}
