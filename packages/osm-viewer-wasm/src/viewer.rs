use std::cell::{Cell, Ref, RefCell};
use std::future::Future;
use std::rc::Rc;

use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::cancellation::{LoadGenerations, LoadToken};
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::loader::{DataLoader, GeometrySource};
use crate::models::{BoundingBox, BranchReport, Layer, LoadReport, LoadStatus};
use crate::render_loop::{FrameRequester, RenderLoop, SceneRenderer};
use crate::scene::Scene;

/// The viewer: owns the scene, camera and controls, runs loads and schedules frames.
///
/// Cheap to clone; clones share the same state, which lets load futures and
/// event handlers hold their own handle.
#[derive(Clone)]
pub struct Viewer {
    inner: Rc<ViewerInner>,
}

struct ViewerInner {
    config: ViewerConfig,
    bbox: Cell<BoundingBox>,
    loader: DataLoader,
    scene: Rc<RefCell<Scene>>,
    camera: Rc<RefCell<PerspectiveCamera>>,
    controls: RefCell<OrbitControls>,
    renderer: Rc<RefCell<dyn SceneRenderer>>,
    viewport: Cell<(f64, f64)>,
    generations: LoadGenerations,
    render_loop: RenderLoop,
}

impl Viewer {
    pub fn new(
        config: ViewerConfig,
        source: Rc<dyn GeometrySource>,
        renderer: Rc<RefCell<dyn SceneRenderer>>,
        frames: Rc<dyn FrameRequester>,
        viewport: (f64, f64),
    ) -> Result<Self, ViewerError> {
        config.validate()?;

        let scene = Rc::new(RefCell::new(Scene::new(&config.scene)));
        let camera = Rc::new(RefCell::new(PerspectiveCamera::new(
            &config.camera,
            viewport.0,
            viewport.1,
        )));
        let loader = DataLoader::new(
            source,
            config.extrude.clone(),
            config.buildings_material,
            config.streets_material,
        );
        let render_loop = RenderLoop::new(frames, renderer.clone(), scene.clone(), camera.clone());

        Ok(Viewer {
            inner: Rc::new(ViewerInner {
                bbox: Cell::new(config.bbox),
                controls: RefCell::new(OrbitControls::new(config.controls)),
                config,
                loader,
                scene,
                camera,
                renderer,
                viewport: Cell::new(viewport),
                generations: LoadGenerations::new(),
                render_loop,
            }),
        })
    }

    pub fn bbox(&self) -> BoundingBox {
        self.inner.bbox.get()
    }

    pub fn scene(&self) -> Ref<'_, Scene> {
        self.inner.scene.borrow()
    }

    pub fn camera(&self) -> PerspectiveCamera {
        *self.inner.camera.borrow()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.inner.render_loop.frames_drawn()
    }

    /// Load the configured bounding box.
    pub fn run(&self) -> impl Future<Output = LoadReport> + 'static {
        self.load()
    }

    /// Switch to a new bounding box and load it, superseding any load in flight.
    pub fn reload(&self, bbox: BoundingBox) -> impl Future<Output = LoadReport> + 'static {
        self.inner.bbox.set(bbox);
        self.load()
    }

    /// Start a load. The scene is rebuilt right away, before the returned
    /// future is first polled; both layers are fetched concurrently and one
    /// redraw is requested once both have settled.
    pub fn load(&self) -> impl Future<Output = LoadReport> + 'static {
        let token = self.inner.generations.begin();
        let bbox = self.inner.bbox.get();
        self.inner.scene.borrow_mut().rebuild(&self.inner.config.scene);
        log::info!("Load {} started for {:?}", token.id, <[f64; 4]>::from(bbox));

        let viewer = self.clone();
        async move {
            let (buildings, streets) = futures::join!(
                viewer.load_branch(Layer::Buildings, bbox, &token),
                viewer.load_branch(Layer::Streets, bbox, &token),
            );

            let status = if token.is_current() {
                viewer.inner.render_loop.request_redraw();
                LoadStatus::Completed
            } else {
                log::info!("Load {} was superseded, skipping its redraw", token.id);
                LoadStatus::Superseded
            };

            LoadReport { generation: token.id, status, buildings, streets }
        }
    }

    async fn load_branch(&self, layer: Layer, bbox: BoundingBox, token: &LoadToken) -> BranchReport {
        let output = self.inner.loader.load_layer(layer, &bbox).await;

        if token.is_superseded() {
            log::info!(
                "Discarding {} {} meshes from superseded load {}",
                output.meshes.len(),
                layer,
                token.id
            );
            return output.report(layer, 0);
        }

        let report = output.report(layer, output.meshes.len());
        self.inner.scene.borrow_mut().extend(output.meshes);
        report
    }

    pub fn pointer_down(&self, button: i16, x: f64, y: f64) {
        self.inner.controls.borrow_mut().pointer_down(button, x, y);
    }

    pub fn pointer_up(&self) {
        self.inner.controls.borrow_mut().pointer_up();
    }

    pub fn pointer_move(&self, x: f64, y: f64) {
        let height = self.inner.viewport.get().1;
        let changed = {
            let mut camera = self.inner.camera.borrow_mut();
            self.inner
                .controls
                .borrow_mut()
                .pointer_move(&mut camera, x, y, height)
        };
        if changed {
            self.inner.render_loop.request_redraw();
        }
    }

    pub fn wheel(&self, delta_y: f64) {
        let changed = {
            let mut camera = self.inner.camera.borrow_mut();
            self.inner.controls.borrow().wheel(&mut camera, delta_y)
        };
        if changed {
            self.inner.render_loop.request_redraw();
        }
    }

    /// Follow a viewport size change: camera aspect, renderer size, one redraw.
    pub fn resize(&self, width: f64, height: f64) -> Result<(), ViewerError> {
        self.inner.viewport.set((width, height));
        self.inner.camera.borrow_mut().set_viewport(width, height);
        self.inner.renderer.borrow_mut().resize(width, height)?;
        self.inner.render_loop.request_redraw();
        Ok(())
    }
}
