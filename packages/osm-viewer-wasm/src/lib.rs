use wasm_bindgen::prelude::*;

// Error taxonomy
pub mod error;
// Query region and load reports
pub mod models;
// Viewer configuration
pub mod config;
// WKB body decoding
pub mod wkb_decoder;
// Polygon to outline conversion
pub mod shape;
// Extrusion and flat triangulation
#[path = "../geometry_functions/extrude.rs"]
pub mod extrude;
// Renderable meshes, materials and the display transform
pub mod mesh;
pub mod scene;
pub mod camera;
// Load generations for stale-load detection
pub mod cancellation;
pub mod loader;
pub mod render_loop;
pub mod viewer;
// wasm-bindgen surface
pub mod web;

#[cfg(test)]
mod test_support;

pub use config::ViewerConfig;
pub use error::{LoadError, ViewerError};
pub use models::{BoundingBox, LoadReport, LoadStatus};
pub use viewer::Viewer;
pub use web::OsmViewer;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

use std::sync::Once;
static INIT: Once = Once::new();

#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        // Route `log` records to the browser console
        let _ = console_log::init_with_level(log::Level::Info);
        log::info!("WASM module initialized");
    });
}
