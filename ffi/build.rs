use std::path::PathBuf;

/// Copies the generated header here as well when set.
const INCLUDE_DIR_VAR: &str = "FETCH_FFI_INCLUDE_DIR";

fn main() {
    let crate_dir = std::env::var("CARGO_MANIFEST_DIR").map(PathBuf::from).unwrap_or_default();
    let Some(out_dir) = std::env::var_os("OUT_DIR").map(PathBuf::from) else {
        println!("cargo:warning=OUT_DIR not set, header not generated");
        return;
    };

    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-env-changed={INCLUDE_DIR_VAR}");

    let generated = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("FETCH_FFI_H")
        .generate();

    let bindings = match generated {
        Ok(bindings) => bindings,
        Err(e) => {
            println!("cargo:warning=cbindgen skipped: {e}");
            return;
        }
    };

    bindings.write_to_file(out_dir.join("fetch_ffi.h"));

    if let Some(dir) = std::env::var_os(INCLUDE_DIR_VAR).map(PathBuf::from) {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            println!("cargo:warning=cannot create {}: {e}", dir.display());
            return;
        }
        bindings.write_to_file(dir.join("fetch_ffi.h"));
    }
}
