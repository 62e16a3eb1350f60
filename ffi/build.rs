use std::env;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("LLAMA_CLIENT_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file("include/llama_client.h");
        }
        Err(err) => {
            println!("cargo:warning=failed to generate C header: {err}");
        }
    }
}
