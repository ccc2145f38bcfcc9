// Browser side: HTTP source, animation frames, the JS engine renderer and the exported class
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use js_sys::{Array, Float32Array, Object, Promise, Reflect, Uint32Array, Uint8Array};
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{Event, EventTarget, HtmlCanvasElement, MouseEvent, Response, WheelEvent, Window};

use crate::camera::PerspectiveCamera;
use crate::config::ViewerConfig;
use crate::error::{js_error_message, LoadError, ViewerError};
use crate::loader::GeometrySource;
use crate::mesh::Mesh;
use crate::models::{BoundingBox, LoadReport};
use crate::render_loop::{FrameRequester, SceneRenderer};
use crate::scene::Scene;
use crate::viewer::Viewer;

// Thin helpers around the JS rendering engine, see www/osm-viewer-helpers.js
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = osmViewerHelpers, js_name = mount, catch)]
    fn helpers_mount(width: f64, height: f64, pixel_ratio: f64) -> Result<HtmlCanvasElement, JsValue>;

    #[wasm_bindgen(js_namespace = osmViewerHelpers, js_name = syncScene, catch)]
    fn helpers_sync_scene(scene: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(js_namespace = osmViewerHelpers, js_name = drawFrame, catch)]
    fn helpers_draw_frame(camera: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(js_namespace = osmViewerHelpers, js_name = setSize, catch)]
    fn helpers_set_size(width: f64, height: f64) -> Result<(), JsValue>;
}

fn dom_error(err: JsValue) -> ViewerError {
    ViewerError::Dom(js_error_message(&err))
}

fn render_error(err: JsValue) -> ViewerError {
    ViewerError::Render(js_error_message(&err))
}

fn network_error(err: JsValue) -> LoadError {
    LoadError::Network(js_error_message(&err))
}

/// Fetches layer bodies over HTTP GET, relative to `base_url`.
pub struct HttpGeometrySource {
    base_url: String,
}

impl HttpGeometrySource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let url = self.url(path);
        let window = web_sys::window().ok_or_else(|| LoadError::Network("no window".to_string()))?;

        let response = JsFuture::from(window.fetch_with_str(&url))
            .await
            .map_err(network_error)?;
        let response: Response = response
            .dyn_into()
            .map_err(|_| LoadError::Network(format!("fetch of {} did not yield a Response", url)))?;

        if !response.ok() {
            return Err(LoadError::HttpStatus { status: response.status(), url });
        }

        let buffer = JsFuture::from(response.array_buffer().map_err(network_error)?)
            .await
            .map_err(network_error)?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}

impl GeometrySource for HttpGeometrySource {
    fn fetch(&self, path: &str) -> LocalBoxFuture<'_, Result<Vec<u8>, LoadError>> {
        let path = path.to_string();
        async move { self.get(&path).await }.boxed_local()
    }
}

/// Frames driven by `requestAnimationFrame`.
pub struct AnimationFrames;

impl FrameRequester for AnimationFrames {
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> Result<(), ViewerError> {
        let window = web_sys::window().ok_or_else(|| ViewerError::Dom("no window".to_string()))?;
        let closure = Closure::once_into_js(move || callback());
        window
            .request_animation_frame(closure.unchecked_ref())
            .map(|_| ())
            .map_err(dom_error)
    }
}

/// Renderer forwarding to the JS engine helpers. Geometry is only uploaded
/// when the scene revision changed since the last frame.
#[derive(Default)]
pub struct JsSceneRenderer {
    synced_revision: Option<u64>,
}

impl SceneRenderer for JsSceneRenderer {
    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), ViewerError> {
        if self.synced_revision != Some(scene.revision()) {
            let js_scene = scene_to_js(scene).map_err(render_error)?;
            helpers_sync_scene(&js_scene).map_err(render_error)?;
            self.synced_revision = Some(scene.revision());
        }
        let camera = serde_wasm_bindgen::to_value(camera)
            .map_err(|e| ViewerError::Render(e.to_string()))?;
        helpers_draw_frame(&camera).map_err(render_error)
    }

    fn resize(&mut self, width: f64, height: f64) -> Result<(), ViewerError> {
        helpers_set_size(width, height).map_err(render_error)
    }
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

/// Plain JS object for the engine: background, fog, lights and meshes with
/// typed-array buffers and a column-major 4x4 world matrix.
pub fn scene_to_js(scene: &Scene) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    set(&obj, "revision", &JsValue::from_f64(scene.revision() as f64))?;
    set(&obj, "background", &JsValue::from(scene.background.0))?;
    set(&obj, "fog", &serde_wasm_bindgen::to_value(&scene.fog)?)?;
    set(&obj, "lights", &serde_wasm_bindgen::to_value(&scene.lights)?)?;

    let meshes = Array::new();
    for mesh in scene.meshes() {
        meshes.push(&mesh_to_js(mesh)?);
    }
    set(&obj, "meshes", &meshes)?;
    Ok(obj.into())
}

fn mesh_to_js(mesh: &Mesh) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    set(&obj, "kind", &serde_wasm_bindgen::to_value(&mesh.kind)?)?;
    set(&obj, "material", &serde_wasm_bindgen::to_value(&mesh.material)?)?;
    set(&obj, "positions", &Float32Array::from(mesh.geometry.positions.as_slice()))?;
    set(&obj, "normals", &Float32Array::from(mesh.geometry.normals.as_slice()))?;
    set(&obj, "indices", &Uint32Array::from(mesh.geometry.indices.as_slice()))?;

    let matrix: Vec<f32> = mesh.transform.matrix().iter().map(|v| *v as f32).collect();
    set(&obj, "matrix", &Float32Array::from(matrix.as_slice()))?;
    Ok(obj.into())
}

/// Accepts either a config object or its JSON text.
pub fn parse_config(value: &JsValue) -> Result<ViewerConfig, ViewerError> {
    if let Some(json) = value.as_string() {
        return ViewerConfig::from_json(&json);
    }
    let config: ViewerConfig = serde_wasm_bindgen::from_value(value.clone())
        .map_err(|e| ViewerError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

fn window_size(window: &Window) -> Result<(f64, f64), ViewerError> {
    let width = window.inner_width().map_err(dom_error)?.as_f64();
    let height = window.inner_height().map_err(dom_error)?.as_f64();
    match (width, height) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(ViewerError::Dom("window size is not a number".to_string())),
    }
}

/// Registered DOM listener, removed again when dropped.
struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn add<E, F>(target: &EventTarget, event: &'static str, mut handler: F) -> Result<Self, ViewerError>
    where
        E: JsCast + 'static,
        F: FnMut(E) + 'static,
    {
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if let Ok(event) = event.dyn_into::<E>() {
                handler(event);
            }
        });
        target
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .map_err(dom_error)?;
        Ok(Self { target: target.clone(), event, closure })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

fn report_promise(load: impl Future<Output = LoadReport> + 'static) -> Promise {
    future_to_promise(async move {
        let report = load.await;
        serde_wasm_bindgen::to_value(&report).map_err(JsValue::from)
    })
}

fn wire_input(
    viewer: &Viewer,
    window: &Window,
    canvas: &HtmlCanvasElement,
) -> Result<Vec<Listener>, ViewerError> {
    let mut listeners = Vec::new();

    let v = viewer.clone();
    listeners.push(Listener::add(canvas, "mousedown", move |e: MouseEvent| {
        v.pointer_down(e.button(), e.client_x() as f64, e.client_y() as f64);
    })?);

    // Drags keep tracking once the pointer leaves the canvas
    let v = viewer.clone();
    listeners.push(Listener::add(window, "mousemove", move |e: MouseEvent| {
        v.pointer_move(e.client_x() as f64, e.client_y() as f64);
    })?);

    let v = viewer.clone();
    listeners.push(Listener::add(window, "mouseup", move |_: MouseEvent| v.pointer_up())?);

    let v = viewer.clone();
    listeners.push(Listener::add(canvas, "wheel", move |e: WheelEvent| {
        e.prevent_default();
        v.wheel(e.delta_y());
    })?);

    listeners.push(Listener::add(canvas, "contextmenu", |e: MouseEvent| e.prevent_default())?);

    let v = viewer.clone();
    let w = window.clone();
    listeners.push(Listener::add(window, "resize", move |_: Event| {
        let resized = window_size(&w).and_then(|(width, height)| v.resize(width, height));
        if let Err(err) = resized {
            log::error!("Resize failed: {}", err);
        }
    })?);

    Ok(listeners)
}

/// The viewer as exposed to JavaScript.
#[wasm_bindgen]
pub struct OsmViewer {
    viewer: Viewer,
    canvas: HtmlCanvasElement,
    _listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl OsmViewer {
    /// Mount the engine canvas sized to the window and wire up input. Nothing
    /// is fetched until `run()`.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<OsmViewer, JsValue> {
        let config = parse_config(&config)?;
        let window = web_sys::window().ok_or_else(|| ViewerError::Dom("no window".to_string()))?;
        let (width, height) = window_size(&window)?;

        let canvas = helpers_mount(width, height, window.device_pixel_ratio()).map_err(dom_error)?;

        let source = Rc::new(HttpGeometrySource::new(config.base_url.clone()));
        let renderer = Rc::new(RefCell::new(JsSceneRenderer::default()));
        let viewer = Viewer::new(config, source, renderer, Rc::new(AnimationFrames), (width, height))?;

        let listeners = wire_input(&viewer, &window, &canvas)?;
        log::info!("Viewer mounted at {}x{}", width, height);

        Ok(OsmViewer { viewer, canvas, _listeners: listeners })
    }

    /// Load the configured bounding box. Resolves to the load report.
    pub fn run(&self) -> Promise {
        report_promise(self.viewer.run())
    }

    /// Load a new bounding box, superseding any load in flight.
    pub fn reload(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Promise, JsValue> {
        let bbox = BoundingBox::new(x1, y1, x2, y2)?;
        Ok(report_promise(self.viewer.reload(bbox)))
    }

    #[wasm_bindgen(getter)]
    pub fn canvas(&self) -> HtmlCanvasElement {
        self.canvas.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn bbox(&self) -> Vec<f64> {
        <[f64; 4]>::from(self.viewer.bbox()).to_vec()
    }

    #[wasm_bindgen(getter, js_name = framesDrawn)]
    pub fn frames_drawn(&self) -> f64 {
        self.viewer.frames_drawn() as f64
    }
}
