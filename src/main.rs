//! Binary entry point that glues the SQLite-backed store to the TUI. We
//! bring up the database, fall back to a disconnected app when that fails
//! (the failure is reported in the status footer rather than killing the
//! process), drive the event loop until the user exits, and release the
//! connection on the way out.
use billing_desk::{run_app, App, Store};

fn main() -> anyhow::Result<()> {
    let mut app = match Store::initialize() {
        Ok(store) => App::new(store),
        Err(err) => App::with_startup_failure(err),
    };

    let result = run_app(&mut app);
    app.close_store();
    result
}
