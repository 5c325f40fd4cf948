fn main() {
    // Node addon link setup, only needed for the native binding build.
    if std::env::var_os("CARGO_FEATURE_NAPI").is_some() {
        napi_build::setup();
    }
}
