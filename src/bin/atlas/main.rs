//! Demo dashboard mounting one panel per view over bundled sample payloads.

mod app;

fn main() -> eframe::Result {
    app::run()
}
