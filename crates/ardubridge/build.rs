// Records the target triple and profile for `ardubridge version --extended`.
fn main() {
    for (source, exported) in [
        ("TARGET", "ARDUBRIDGE_BUILD_TARGET"),
        ("PROFILE", "ARDUBRIDGE_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(source) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={source}");
    }
}
