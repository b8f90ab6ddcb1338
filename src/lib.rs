use wasm_bindgen::prelude::*;

mod utils;
mod scene;
mod settings;
mod text;
mod renderer;
pub mod animator;

use settings::Settings;


#[wasm_bindgen(start)]
pub fn dummy_main() {
}


/// Runs the demo selected by the page's `?demo=` query parameter
#[wasm_bindgen]
pub async fn run() {
    utils::set_panic_hook();
    let settings = Settings::from_page();
    if let Err(e) = renderer::main(settings).await {
        log!("run(): ERROR: {}", e);
    }
}
