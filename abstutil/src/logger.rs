/// Initializes `env_logger` so that `log::{info,warn,debug,trace}!` calls made anywhere in the
/// workspace go somewhere.
///
/// You can adjust the log level without recompiling with the RUST_LOG env variable.
///
///     RUST_LOG=debug cargo run --bin traffic-demo
///
/// This can be done on a per-module basis:
///
///     RUST_LOG=traffic_core::lane_window=debug cargo run --bin traffic-demo
pub fn setup() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();
}
